#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;

#[cfg(feature = "cli")]
pub use cli::{AggregateArgs, BatchArgs, CliConfig, Commands, FindArgs};
pub use settings::ScoutConfig;
