pub mod config;
pub mod error;
pub mod types;

pub use config::{RetryConfig, SearchConfig};
pub use error::{ErrorKind, JobsError, ProviderError, Result};
pub use types::*;
