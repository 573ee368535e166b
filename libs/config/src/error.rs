use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File missing, unreadable or not matching the expected shape
    #[error("Failed to load configuration from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: config_crate::ConfigError,
    },

    /// Inline JSON document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid port {port:?}: expected a number between 0 and 65535")]
    InvalidPort { port: String },

    #[error("Invalid configuration field '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
