use crate::adapters::gemini::{GeminiOptions, DEFAULT_TIMEOUT_SECONDS};
use crate::core::aggregate::{FilterConfig, DEFAULT_OUTPUT_FILE};
use crate::core::batch::{FixedPacing, Presets, SLEEP_ERROR, SLEEP_SUCCESS};
use crate::domain::model::CompanyScale;
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Settings file. Every section and key is optional; command-line flags
/// take precedence over anything set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub gemini: GeminiSection,
    pub batch: BatchSection,
    pub aggregate: AggregateSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub grounding: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub output_dir: Option<String>,
    pub sleep_success_seconds: Option<u64>,
    pub sleep_error_seconds: Option<u64>,
    pub presets: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSection {
    pub results_dir: Option<String>,
    pub output_path: Option<String>,
    pub allowed_scales: Option<Vec<String>>,
    pub excluded_countries: Option<Vec<String>>,
}

impl ScoutConfig {
    /// Reads the settings file, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        tracing::debug!("Loaded settings from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| ScoutError::InvalidConfigValueError {
            field: "settings".to_string(),
            value: "<toml>".to_string(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables stay literal.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ScoutError::config(format!("placeholder pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// The Gemini credential: the settings value when it resolved, else the
    /// `GEMINI_API_KEY` environment variable.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_or(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_or(&self, env_value: Option<String>) -> Result<String> {
        let configured = self
            .gemini
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.contains("${"));

        configured
            .map(str::to_string)
            .or_else(|| env_value.filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| ScoutError::MissingConfigError {
                field: API_KEY_ENV.to_string(),
            })
    }

    pub fn gemini_options(&self) -> GeminiOptions {
        let defaults = GeminiOptions::default();
        GeminiOptions {
            model: self.gemini.model.clone().unwrap_or(defaults.model),
            base_url: self.gemini.base_url.clone().unwrap_or(defaults.base_url),
            temperature: self.gemini.temperature,
            max_output_tokens: self.gemini.max_output_tokens,
            timeout: Duration::from_secs(
                self.gemini
                    .timeout_seconds
                    .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            ),
        }
    }

    pub fn grounding(&self) -> bool {
        self.gemini.grounding.unwrap_or(true)
    }

    pub fn output_dir(&self) -> &str {
        self.batch.output_dir.as_deref().unwrap_or(DEFAULT_RESULTS_DIR)
    }

    pub fn pacing(&self) -> FixedPacing {
        FixedPacing::new(
            self.batch
                .sleep_success_seconds
                .map(Duration::from_secs)
                .unwrap_or(SLEEP_SUCCESS),
            self.batch
                .sleep_error_seconds
                .map(Duration::from_secs)
                .unwrap_or(SLEEP_ERROR),
        )
    }

    pub fn presets(&self) -> Presets {
        Presets::with_custom(&self.batch.presets)
    }

    pub fn results_dir(&self) -> &str {
        self.aggregate
            .results_dir
            .as_deref()
            .unwrap_or(DEFAULT_RESULTS_DIR)
    }

    pub fn aggregate_output(&self) -> &str {
        self.aggregate
            .output_path
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_FILE)
    }

    pub fn filter_config(&self) -> Result<FilterConfig> {
        let mut config = FilterConfig::default();

        if let Some(scales) = &self.aggregate.allowed_scales {
            config.allowed_scales = scales
                .iter()
                .map(|s| {
                    s.parse::<CompanyScale>()
                        .map_err(|reason| ScoutError::InvalidConfigValueError {
                            field: "aggregate.allowed_scales".to_string(),
                            value: s.clone(),
                            reason,
                        })
                })
                .collect::<Result<_>>()?;
        }
        if let Some(countries) = &self.aggregate.excluded_countries {
            config.excluded_countries = countries.clone();
        }

        Ok(config)
    }
}

impl Validate for ScoutConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.gemini.base_url {
            validation::validate_url("gemini.base_url", url)?;
        }
        if let Some(model) = &self.gemini.model {
            validation::validate_non_empty_string("gemini.model", model)?;
        }
        if let Some(temperature) = self.gemini.temperature {
            validation::validate_range("gemini.temperature", temperature, 0.0, 2.0)?;
        }
        if let Some(tokens) = self.gemini.max_output_tokens {
            validation::validate_positive_number("gemini.max_output_tokens", tokens.into(), 1)?;
        }
        if let Some(timeout) = self.gemini.timeout_seconds {
            validation::validate_positive_number("gemini.timeout_seconds", timeout, 1)?;
        }

        validation::validate_path("batch.output_dir", self.output_dir())?;
        validation::validate_path("aggregate.results_dir", self.results_dir())?;
        validation::validate_path("aggregate.output_path", self.aggregate_output())?;

        for (name, cities) in &self.batch.presets {
            if cities.iter().all(|city| city.trim().is_empty()) {
                return Err(ScoutError::InvalidConfigValueError {
                    field: format!("batch.presets.{}", name),
                    value: format!("{:?}", cities),
                    reason: "Preset must list at least one city".to_string(),
                });
            }
        }

        self.filter_config()?;
        Ok(())
    }
}
