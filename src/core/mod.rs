pub mod aggregate;
pub mod batch;
pub mod discovery;
pub mod finder;
pub mod schema;

pub use crate::domain::model::{Company, Location, LocationResult, Summit};
pub use crate::domain::ports::{DiscoveryService, LlmClient, LocationRunner, Storage};
pub use crate::utils::error::Result;
