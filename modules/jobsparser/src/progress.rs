//! Progress events and the observers that report them.
//!
//! Reporters only watch: `on_event` returns nothing and the fetch loop never
//! waits on it, so a slow or failing reporter cannot change what gets fetched.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use jobsparser_common::{ErrorKind, Site};

use crate::fetcher::FetchOutcome;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        combinations: usize,
    },
    CombinationStarted {
        index: usize,
        total: usize,
        search_term: String,
        site: Site,
    },
    Sleeping {
        search_term: String,
        site: Site,
        offset: usize,
        attempt: u32,
        delay_ms: u64,
    },
    BatchRequested {
        search_term: String,
        site: Site,
        offset: usize,
        limit: usize,
        attempt: u32,
    },
    BatchFetched {
        search_term: String,
        site: Site,
        offset: usize,
        requested: usize,
        returned: usize,
        inserted: usize,
        collected: usize,
        wanted: usize,
    },
    BatchFailed {
        search_term: String,
        site: Site,
        offset: usize,
        attempt: u32,
        max_retries: u32,
        error_kind: ErrorKind,
        error: String,
    },
    SupplyExhausted {
        search_term: String,
        site: Site,
        collected: usize,
        wanted: usize,
    },
    RetriesExhausted {
        search_term: String,
        site: Site,
        offset: usize,
        attempts: u32,
    },
    CombinationFinished {
        index: usize,
        total: usize,
        outcome: FetchOutcome,
    },
    CheckpointWritten {
        path: PathBuf,
        records: usize,
    },
    Flushed {
        path: PathBuf,
        records: usize,
    },
    Cancelled {
        search_term: String,
        site: Site,
        collected: usize,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

// ---------------------------------------------------------------------------
// TracingReporter
// ---------------------------------------------------------------------------

/// Human-readable status lines through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, combinations } => {
                info!(run_id = %run_id, combinations, "Starting run");
            }
            ProgressEvent::CombinationStarted {
                index,
                total,
                search_term,
                site,
            } => {
                info!(%site, search_term = %search_term, "Combination {}/{}", index + 1, total);
            }
            ProgressEvent::Sleeping {
                site,
                attempt,
                delay_ms,
                ..
            } => {
                info!(%site, attempt, "Sleeping for {:.1} seconds", *delay_ms as f64 / 1000.0);
            }
            ProgressEvent::BatchRequested {
                site,
                offset,
                limit,
                attempt,
                ..
            } => {
                info!(%site, attempt, "Fetching jobs {} to {}", offset, offset + limit);
            }
            ProgressEvent::BatchFetched {
                search_term,
                site,
                returned,
                inserted,
                collected,
                wanted,
                ..
            } => {
                info!(%site, search_term = %search_term, returned, inserted, "Scraped {collected}/{wanted} jobs");
            }
            ProgressEvent::BatchFailed {
                site,
                offset,
                attempt,
                max_retries,
                error_kind,
                error,
                ..
            } => {
                warn!(%site, offset, attempt, max_retries, kind = %error_kind, error = %error, "Batch failed");
            }
            ProgressEvent::SupplyExhausted {
                search_term,
                site,
                collected,
                wanted,
            } => {
                info!(%site, search_term = %search_term, "No more jobs available. Wanted {wanted} jobs, got {collected}");
            }
            ProgressEvent::RetriesExhausted {
                search_term,
                site,
                offset,
                attempts,
            } => {
                warn!(%site, search_term = %search_term, offset, attempts, "Max retries reached, moving on");
            }
            ProgressEvent::CombinationFinished { index, total, outcome } => {
                info!(
                    site = %outcome.site,
                    search_term = %outcome.search_term,
                    collected = outcome.total_collected,
                    retries = outcome.retries,
                    exhausted = outcome.retries_exhausted,
                    "Finished combination {}/{}",
                    index + 1,
                    total
                );
            }
            ProgressEvent::CheckpointWritten { path, records } => {
                info!(path = %path.display(), records, "Checkpoint saved");
            }
            ProgressEvent::Flushed { path, records } => {
                info!(path = %path.display(), "Successfully saved {records} jobs");
            }
            ProgressEvent::Cancelled {
                search_term,
                site,
                collected,
            } => {
                warn!(%site, search_term = %search_term, collected, "Cancelled");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FanoutReporter
// ---------------------------------------------------------------------------

/// Forwards every event to each inner reporter in order.
#[derive(Default, Clone)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn ProgressReporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }
}

impl ProgressReporter for FanoutReporter {
    fn on_event(&self, event: &ProgressEvent) {
        for reporter in &self.reporters {
            reporter.on_event(event);
        }
    }
}
