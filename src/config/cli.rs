use crate::core::batch::{plan_locations, Presets, EUROPE_PRESET};
use crate::domain::model::Location;
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::{parse_iso_date, validate_date_range};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "summit-scout", version)]
#[command(about = "Find tech summits per city, collect attending companies, and aggregate them")]
pub struct CliConfig {
    /// TOML settings file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search one city for summits and their companies
    Find(FindArgs),
    /// Search many cities one after another, pausing between them
    Batch(BatchArgs),
    /// Merge saved results into one filtered company list
    Aggregate(AggregateArgs),
}

#[derive(Debug, Args)]
pub struct FindArgs {
    pub city: String,

    /// Start date (YYYY-MM-DD)
    pub start: String,

    /// End date (YYYY-MM-DD)
    pub end: String,

    /// Print the result to stdout instead of writing a file
    #[arg(long)]
    pub no_save: bool,

    /// Exact file to write, overriding the generated name
    #[arg(long, value_name = "PATH", conflicts_with = "no_save")]
    pub output_path: Option<String>,

    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<String>,
}

impl FindArgs {
    pub fn location(&self) -> Result<Location> {
        let city = self.city.trim();
        if city.is_empty() {
            return Err(ScoutError::config("city cannot be empty"));
        }
        let start = parse_iso_date("start", &self.start)?;
        let end = parse_iso_date("end", &self.end)?;
        validate_date_range(start, end)?;
        Ok(Location::new(city, start, end))
    }
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    pub cities: Vec<String>,

    /// Include the major European tech hubs
    #[arg(long)]
    pub europe: bool,

    /// Include a named city list (repeatable)
    #[arg(long = "preset", value_name = "NAME")]
    pub presets: Vec<String>,

    #[arg(long, default_value = "2025-01-01")]
    pub time_start: String,

    #[arg(long, default_value = "2025-12-31")]
    pub time_end: String,

    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<String>,
}

impl BatchArgs {
    pub fn preset_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.europe {
            names.push(EUROPE_PRESET.to_string());
        }
        names.extend(self.presets.iter().cloned());
        names
    }

    pub fn plan(&self, presets: &Presets) -> Result<Vec<Location>> {
        let start = parse_iso_date("time-start", &self.time_start)?;
        let end = parse_iso_date("time-end", &self.time_end)?;
        plan_locations(&self.cities, &self.preset_names(), presets, start, end)
    }
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[arg(long, value_name = "DIR")]
    pub results_dir: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,
}

/// Splits a file path into the directory a storage is rooted at and the file name.
pub fn split_output_path(path: &str) -> Result<(PathBuf, String)> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScoutError::InvalidConfigValueError {
            field: "output".to_string(),
            value: path.display().to_string(),
            reason: "Path must name a file".to_string(),
        })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string()))
}
