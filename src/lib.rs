pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ScoutConfig;

pub use adapters::{GeminiClient, GeminiOptions, LocalStorage};
pub use core::aggregate::{AggregationReport, Aggregator, FilterConfig};
pub use core::batch::{BatchOrchestrator, FixedPacing, PacingPolicy, Presets};
pub use core::discovery::ModelDiscovery;
pub use core::finder::LocationFinder;
pub use domain::model::{
    AggregatedCompany, BatchRunSummary, Company, CompanyField, CompanyScale, Location,
    LocationResult, LocationStatus, Summit,
};
pub use utils::error::{DiscoveryError, Result, ScoutError};
