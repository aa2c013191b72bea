//! Error types for Stockwatch.

use std::path::PathBuf;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum StockwatchError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Notification error: {0}")]
    Notify(String),
}

/// Startup configuration errors. Any of these aborts the process before the
/// first check.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set as an environment variable")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to load env file: {0}")]
    EnvFile(String),
}

/// Failure of a single polling request, before classification.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("HTTP error {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl FetchError {
    /// Status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Short label used in attempt logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Connect(_) => "connection",
            FetchError::Status(_) => "http",
            FetchError::Decode(_) => "decode",
            FetchError::Other(_) => "unexpected",
        }
    }
}

/// 401 and 403 mean the session's credentials went stale.
pub fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}

pub type Result<T> = std::result::Result<T, StockwatchError>;
