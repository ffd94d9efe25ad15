use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobsError>;

/// Transient failures raised by a search provider. All of them are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::RateLimited(_) => ErrorKind::RateLimited,
            ProviderError::Network(_) => ErrorKind::NetworkError,
            ProviderError::Parse(_) => ErrorKind::ParseError,
            ProviderError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

#[derive(Error, Debug)]
pub enum JobsError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run cancelled")]
    Cancelled,
}

impl JobsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JobsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobsError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            JobsError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            JobsError::Provider(e) => e.kind(),
            JobsError::Io { .. } => ErrorKind::Io,
            JobsError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Flat error classification carried by outcomes and run logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    InvalidConfig,
    RateLimited,
    NetworkError,
    ParseError,
    Timeout,
    Io,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Io => "io",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
