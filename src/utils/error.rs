use thiserror::Error;

/// Failures of the external discovery service.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Discovery service rejected the credential (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Discovery service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Discovery service returned no content: {reason}")]
    EmptyResponse { reason: String },

    #[error("Malformed {schema} response: {reason}")]
    Malformed { schema: String, reason: String },
}

impl DiscoveryError {
    /// Network and auth failures: nothing useful can be produced for the
    /// location, so these escalate past the finder instead of becoming a
    /// Failure-status result.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DiscoveryError::Transport(_) | DiscoveryError::Unauthorized { .. }
        )
    }

    pub fn malformed(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        DiscoveryError::Malformed {
            schema: schema.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScoutError {
    pub fn config(message: impl Into<String>) -> Self {
        ScoutError::ConfigError {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScoutError::Discovery(e) if e.is_transport() => ErrorSeverity::Medium,
            ScoutError::Discovery(_) | ScoutError::ParseError { .. } => ErrorSeverity::High,
            ScoutError::SerializationError(_) => ErrorSeverity::High,
            ScoutError::IoError(_) => ErrorSeverity::Critical,
            ScoutError::ConfigError { .. }
            | ScoutError::MissingConfigError { .. }
            | ScoutError::InvalidConfigValueError { .. } => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ScoutError::Discovery(DiscoveryError::Unauthorized { .. }) => {
                "The AI service rejected the API key".to_string()
            }
            ScoutError::Discovery(DiscoveryError::Transport(_)) => {
                "Could not reach the AI service".to_string()
            }
            ScoutError::Discovery(e) => format!("The AI service failed: {}", e),
            ScoutError::IoError(e) => format!("File system error: {}", e),
            ScoutError::SerializationError(e) => format!("Could not encode results: {}", e),
            ScoutError::ParseError { path, .. } => format!("Could not read {}", path),
            ScoutError::ConfigError { message } => format!("Invalid configuration: {}", message),
            ScoutError::MissingConfigError { field } => format!("Missing setting: {}", field),
            ScoutError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ScoutError::Discovery(DiscoveryError::Unauthorized { .. })
            | ScoutError::MissingConfigError { .. } => {
                "Export GEMINI_API_KEY or set gemini.api_key in the settings file"
            }
            ScoutError::Discovery(DiscoveryError::Transport(_)) => {
                "Check the network connection and gemini.base_url, then retry"
            }
            ScoutError::Discovery(_) => "Wait for the quota window to reset and rerun the location",
            ScoutError::IoError(_) => "Check that the output directory exists and is writable",
            ScoutError::SerializationError(_) | ScoutError::ParseError { .. } => {
                "Remove or regenerate the offending result file"
            }
            ScoutError::ConfigError { .. } | ScoutError::InvalidConfigValueError { .. } => {
                "Fix the command-line arguments or the settings file"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
