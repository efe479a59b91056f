use crate::domain::model::{CompanyProfile, Location, LocationResult, Summit};
use crate::utils::error::{DiscoveryError, Result};
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// File names (not paths) with the given extension, sorted lexicographically.
    fn list_files(
        &self,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    /// Where `path` ends up, for log lines and summaries.
    fn locate(&self, path: &str) -> String;
}

/// Raw access to a generative model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Free-text answer; `grounding` lets the model consult web search.
    async fn generate_text(
        &self,
        prompt: &str,
        grounding: bool,
    ) -> std::result::Result<String, DiscoveryError>;

    /// JSON text constrained by `schema`.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> std::result::Result<String, DiscoveryError>;
}

/// The two capabilities the pipeline needs from the outside world. Every call
/// costs quota; nothing is cached.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    async fn find_summits(
        &self,
        location: &Location,
    ) -> std::result::Result<Vec<Summit>, DiscoveryError>;

    async fn find_companies(
        &self,
        summit: &Summit,
    ) -> std::result::Result<Vec<CompanyProfile>, DiscoveryError>;
}

/// Produces and persists the result for one location. An `Err` means the
/// location could not be processed at all.
#[async_trait]
pub trait LocationRunner: Send + Sync {
    async fn run(&self, location: &Location) -> Result<(LocationResult, String)>;
}
