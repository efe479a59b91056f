use crate::domain::model::{normalize, BatchRunSummary, Location};
use crate::domain::ports::LocationRunner;
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::validate_date_range;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

pub const EUROPE_PRESET: &str = "europe";

/// Major European tech hubs.
pub const EUROPE_TECH_HUBS: [&str; 15] = [
    "Berlin",
    "Amsterdam",
    "Paris",
    "Barcelona",
    "Dublin",
    "Lisbon",
    "Munich",
    "Madrid",
    "Stockholm",
    "Milan",
    "Vienna",
    "Copenhagen",
    "Helsinki",
    "Warsaw",
    "Prague",
];

pub const SLEEP_SUCCESS: Duration = Duration::from_secs(60);
pub const SLEEP_ERROR: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// How long to wait after a location before starting the next one.
pub trait PacingPolicy: Send + Sync {
    fn delay_after(&self, outcome: Outcome) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPacing {
    pub on_success: Duration,
    pub on_error: Duration,
}

impl FixedPacing {
    pub fn new(on_success: Duration, on_error: Duration) -> Self {
        Self {
            on_success,
            on_error,
        }
    }

    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl Default for FixedPacing {
    fn default() -> Self {
        Self::new(SLEEP_SUCCESS, SLEEP_ERROR)
    }
}

impl PacingPolicy for FixedPacing {
    fn delay_after(&self, outcome: Outcome) -> Duration {
        match outcome {
            Outcome::Succeeded => self.on_success,
            Outcome::Failed => self.on_error,
        }
    }
}

/// Named city lists selectable from the command line. `europe` is always present.
#[derive(Debug, Clone)]
pub struct Presets {
    lists: BTreeMap<String, Vec<String>>,
}

impl Default for Presets {
    fn default() -> Self {
        let mut lists = BTreeMap::new();
        lists.insert(
            EUROPE_PRESET.to_string(),
            EUROPE_TECH_HUBS.iter().map(|c| c.to_string()).collect(),
        );
        Self { lists }
    }
}

impl Presets {
    /// Built-in presets extended (or overridden, by name) with configured ones.
    pub fn with_custom(custom: &BTreeMap<String, Vec<String>>) -> Self {
        let mut presets = Self::default();
        for (name, cities) in custom {
            presets.lists.insert(normalize(name), cities.clone());
        }
        presets
    }

    pub fn get(&self, name: &str) -> Result<&[String]> {
        self.lists
            .get(&normalize(name))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                ScoutError::config(format!(
                    "unknown preset '{}' (available: {})",
                    name,
                    self.names().join(", ")
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.lists.keys().map(String::as_str).collect()
    }
}

/// Builds the location list for a batch: explicit cities first, then preset
/// cities. Cities that would share a result file ("New York", "new-york")
/// are dropped in favour of the first occurrence.
pub fn plan_locations(
    cities: &[String],
    preset_names: &[String],
    presets: &Presets,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<Location>> {
    validate_date_range(start_date, end_date)?;

    let mut candidates: Vec<&str> = cities.iter().map(String::as_str).collect();
    for name in preset_names {
        candidates.extend(presets.get(name)?.iter().map(String::as_str));
    }

    let mut seen = HashSet::new();
    let locations: Vec<Location> = candidates
        .into_iter()
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(|city| Location::new(city, start_date, end_date))
        .filter(|location| seen.insert(location.file_name()))
        .collect();

    if locations.is_empty() {
        return Err(ScoutError::config(
            "no locations provided; pass cities or a preset such as --europe",
        ));
    }
    Ok(locations)
}

/// Runs locations one after another, pausing between them, and never lets a
/// single location abort the batch.
pub struct BatchOrchestrator<R: LocationRunner, P: PacingPolicy> {
    runner: R,
    pacing: P,
}

impl<R: LocationRunner, P: PacingPolicy> BatchOrchestrator<R, P> {
    pub fn new(runner: R, pacing: P) -> Self {
        Self { runner, pacing }
    }

    pub async fn run(&self, locations: &[Location]) -> BatchRunSummary {
        let total = locations.len();
        let mut summary = BatchRunSummary {
            total,
            ..BatchRunSummary::default()
        };

        if let (Some(first), Some(last)) = (locations.first(), locations.last()) {
            tracing::info!(
                "Starting batch run for {} locations ({} to {})",
                total,
                first.start_date,
                last.end_date
            );
        }

        for (i, location) in locations.iter().enumerate() {
            tracing::info!("[{}/{}] Processing location: {}", i + 1, total, location.city);

            let outcome = match self.runner.run(location).await {
                Ok((result, path)) => {
                    summary.saved.push(path);
                    if result.is_success() {
                        tracing::info!(
                            "Successfully processed {}: {} companies",
                            location.city,
                            result.companies.len()
                        );
                        Outcome::Succeeded
                    } else {
                        tracing::error!(
                            "Summit discovery failed for {}: {}",
                            location.city,
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                        Outcome::Failed
                    }
                }
                Err(e) => {
                    tracing::error!("Error processing {}: {}", location.city, e);
                    Outcome::Failed
                }
            };

            match outcome {
                Outcome::Succeeded => summary.succeeded += 1,
                Outcome::Failed => {
                    summary.failed += 1;
                    summary.failed_locations.push(location.clone());
                }
            }

            if i + 1 < total {
                let delay = self.pacing.delay_after(outcome);
                if !delay.is_zero() {
                    tracing::info!("Sleeping for {:?} before next location...", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        log_summary(&summary);
        summary
    }
}

fn log_summary(summary: &BatchRunSummary) {
    tracing::info!("========================================");
    tracing::info!("SUMMARY");
    tracing::info!("========================================");
    tracing::info!("Total locations processed: {}", summary.total);
    tracing::info!("Successful: {}", summary.succeeded);
    tracing::info!("Failed: {}", summary.failed);
    if !summary.failed_locations.is_empty() {
        tracing::info!("Failed locations:");
        for location in &summary.failed_locations {
            tracing::info!("  - {}", location);
        }
    }
    tracing::info!("========================================");
}
