use crate::domain::model::{Location, LocationResult, LocationStatus, SkippedSummit};
use crate::domain::ports::{DiscoveryService, LocationRunner, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Finds the summits of one location and the companies attending each of them.
pub struct LocationFinder<D: DiscoveryService, S: Storage> {
    discovery: D,
    storage: S,
}

impl<D: DiscoveryService, S: Storage> LocationFinder<D, S> {
    pub fn new(discovery: D, storage: S) -> Self {
        Self { discovery, storage }
    }

    /// Runs discovery without persisting anything.
    ///
    /// A failed summit search yields a `Failure` result, except for transport
    /// level errors (network, rejected credential) which are returned as `Err`.
    /// A failed company search only skips that summit.
    pub async fn find(&self, location: &Location) -> Result<LocationResult> {
        tracing::info!("Starting company search for {}", location);

        let summits = match self.discovery.find_summits(location).await {
            Ok(summits) => summits,
            Err(e) if e.is_transport() => return Err(e.into()),
            Err(e) => {
                tracing::error!("Summit discovery failed for {}: {}", location.city, e);
                return Ok(LocationResult::failure(location.clone(), e.to_string()));
            }
        };

        let mut companies = Vec::new();
        let mut skipped_summits = Vec::new();
        let total = summits.len();

        for (i, summit) in summits.iter().enumerate() {
            tracing::info!("Processing summit {}/{}: {}", i + 1, total, summit.name);
            match self.discovery.find_companies(summit).await {
                Ok(found) => companies.extend(
                    found
                        .into_iter()
                        .map(|profile| profile.attend(&summit.name, location)),
                ),
                Err(e) => {
                    tracing::warn!("Skipping companies of {}: {}", summit.name, e);
                    skipped_summits.push(SkippedSummit {
                        summit: summit.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Search complete for {}: {} summits, {} companies, {} summits skipped",
            location.city,
            total,
            companies.len(),
            skipped_summits.len()
        );

        Ok(LocationResult {
            location: location.clone(),
            status: LocationStatus::Success,
            error: None,
            summits,
            companies,
            skipped_summits,
        })
    }

    /// Writes the result under its deterministic file name, or `file_name` when given.
    pub async fn save(&self, result: &LocationResult, file_name: Option<&str>) -> Result<String> {
        let default_name = result.location.file_name();
        let name = file_name.unwrap_or(&default_name);

        let mut json = serde_json::to_string_pretty(result)?;
        json.push('\n');
        self.storage.write_file(name, json.as_bytes()).await?;

        let path = self.storage.locate(name);
        tracing::info!("Results saved to {}", path);
        Ok(path)
    }
}

#[async_trait]
impl<D: DiscoveryService, S: Storage> LocationRunner for LocationFinder<D, S> {
    async fn run(&self, location: &Location) -> Result<(LocationResult, String)> {
        let result = self.find(location).await?;
        let path = self.save(&result, None).await?;
        Ok((result, path))
    }
}
