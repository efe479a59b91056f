use crate::domain::model::{normalize, AggregatedCompany, Company, CompanyScale, LocationResult};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, ScoutError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const DEFAULT_OUTPUT_FILE: &str = "filtered_companies.json";

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub allowed_scales: BTreeSet<CompanyScale>,
    pub excluded_countries: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_scales: [CompanyScale::Startup, CompanyScale::Small, CompanyScale::Medium]
                .into_iter()
                .collect(),
            excluded_countries: vec!["United States".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationReport {
    pub files_read: usize,
    pub files_skipped: usize,
    pub failed_results: usize,
    pub total_companies: usize,
    pub after_scale_filter: usize,
    pub after_country_filter: usize,
    pub unique_companies: usize,
    pub by_scale: BTreeMap<String, usize>,
    pub top_fields: Vec<(String, usize)>,
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub companies: Vec<AggregatedCompany>,
    pub report: AggregationReport,
}

#[derive(Debug, Default)]
pub struct LoadedResults {
    pub results: Vec<LocationResult>,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// Merges persisted location results into one filtered, deduplicated company list.
pub struct Aggregator {
    config: FilterConfig,
    excluded: HashSet<String>,
}

impl Aggregator {
    pub fn new(config: FilterConfig) -> Self {
        let excluded = config
            .excluded_countries
            .iter()
            .map(|c| normalize(c))
            .collect();
        Self { config, excluded }
    }

    fn keeps_scale(&self, company: &Company) -> bool {
        self.config.allowed_scales.contains(&company.scale)
    }

    fn keeps_country(&self, company: &Company) -> bool {
        !self.excluded.contains(&normalize(&company.country))
    }

    /// Reads every `*.json` file in filename order. Files that cannot be read
    /// or do not parse as a location result are skipped with a warning.
    pub async fn load<S: Storage>(&self, source: &S, ignore: &[String]) -> Result<LoadedResults> {
        let mut loaded = LoadedResults::default();

        for name in source.list_files("json").await? {
            if ignore.contains(&source.locate(&name)) {
                tracing::debug!("Ignoring {}", name);
                continue;
            }

            let bytes = match source.read_file(&name).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {}: {}", source.locate(&name), e);
                    loaded.files_skipped += 1;
                    continue;
                }
            };
            match serde_json::from_slice::<LocationResult>(&bytes) {
                Ok(result) => {
                    loaded.files_read += 1;
                    loaded.results.push(result);
                }
                Err(e) => {
                    let err = ScoutError::ParseError {
                        path: source.locate(&name),
                        message: e.to_string(),
                    };
                    tracing::warn!("Skipping file: {}", err);
                    loaded.files_skipped += 1;
                }
            }
        }

        Ok(loaded)
    }

    /// Filter and deduplicate. Only `Success` results contribute; the first
    /// company seen for an identity wins, and the output is ordered by name.
    pub fn aggregate(&self, results: &[LocationResult]) -> Aggregation {
        let mut report = AggregationReport::default();

        let mut companies: Vec<&Company> = Vec::new();
        for result in results {
            if result.is_success() {
                companies.extend(result.companies.iter());
            } else {
                report.failed_results += 1;
            }
        }
        report.total_companies = companies.len();

        companies.retain(|c| self.keeps_scale(c));
        report.after_scale_filter = companies.len();

        companies.retain(|c| self.keeps_country(c));
        report.after_country_filter = companies.len();

        let mut seen = HashSet::new();
        let mut unique: Vec<AggregatedCompany> = companies
            .into_iter()
            .filter(|c| seen.insert(c.identity()))
            .map(AggregatedCompany::from)
            .collect();
        unique.sort_by_cached_key(|c| normalize(&c.name));
        report.unique_companies = unique.len();

        for scale in &self.config.allowed_scales {
            let count = unique.iter().filter(|c| c.scale == *scale).count();
            report.by_scale.insert(scale.to_string(), count);
        }
        report.top_fields = top_fields(&unique, 10);

        Aggregation {
            companies: unique,
            report,
        }
    }

    /// Load from `source`, aggregate, and write `output_name` into `sink`.
    pub async fn run<S: Storage, O: Storage>(
        &self,
        source: &S,
        sink: &O,
        output_name: &str,
    ) -> Result<AggregationReport> {
        let output_path = sink.locate(output_name);
        tracing::info!("Processing result files from: {}", source.locate(""));

        let loaded = self.load(source, std::slice::from_ref(&output_path)).await?;
        tracing::info!(
            "Loaded {} result files ({} skipped)",
            loaded.files_read,
            loaded.files_skipped
        );

        let Aggregation {
            companies,
            mut report,
        } = self.aggregate(&loaded.results);
        report.files_read = loaded.files_read;
        report.files_skipped = loaded.files_skipped;

        tracing::info!("Found {} total company entries", report.total_companies);
        tracing::info!("After filtering by scale: {} companies", report.after_scale_filter);
        tracing::info!("After excluding countries: {} companies", report.after_country_filter);
        tracing::info!("After removing duplicates: {} unique companies", report.unique_companies);

        sink.write_file(output_name, &render(&companies)?).await?;
        tracing::info!("Output saved to: {}", output_path);
        report.output_path = Some(output_path);

        Ok(report)
    }
}

/// Pretty JSON with a trailing newline; stable for identical input.
pub fn render(companies: &[AggregatedCompany]) -> Result<Vec<u8>> {
    let mut json = serde_json::to_string_pretty(companies)?;
    json.push('\n');
    Ok(json.into_bytes())
}

fn top_fields(companies: &[AggregatedCompany], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for company in companies {
        *counts.entry(company.field.to_string()).or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}
