pub mod backoff;
pub mod fetcher;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod providers;
pub mod rate_limit;
pub mod run_log;
pub mod store;
pub mod summary;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use backoff::Backoff;
pub use fetcher::{BatchFetcher, FetchOutcome};
pub use orchestrator::Orchestrator;
pub use output::Destination;
pub use progress::{FanoutReporter, ProgressEvent, ProgressReporter, TracingReporter};
pub use providers::DefaultProviderFactory;
pub use rate_limit::RateLimiter;
pub use run_log::RunLog;
pub use store::ResultStore;
pub use summary::RunSummary;
pub use traits::{ProviderFactory, SearchProvider};
