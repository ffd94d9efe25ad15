use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZipRecruiterError>;

#[derive(Debug, Error)]
pub enum ZipRecruiterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Blocked for too many requests (status 429)")]
    RateLimited,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid proxy {proxy}: {message}")]
    Proxy { proxy: String, message: String },
}

impl From<reqwest::Error> for ZipRecruiterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ZipRecruiterError::Timeout(err.to_string())
        } else if err.is_decode() {
            ZipRecruiterError::Parse(err.to_string())
        } else {
            ZipRecruiterError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ZipRecruiterError {
    fn from(err: serde_json::Error) -> Self {
        ZipRecruiterError::Parse(err.to_string())
    }
}
