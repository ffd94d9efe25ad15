//! Drives one (search term, site) combination to completion.
//!
//! Calls the provider with increasing offsets until `results_wanted` records
//! have been collected, the provider runs dry, retries at one offset are used
//! up, or the run is cancelled. Each successful batch is appended to the
//! shared `ResultStore` before the next call is made.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use jobsparser_common::{ErrorKind, JobsError, ProviderError, RetryConfig, SearchRequest, Site};

use crate::backoff::Backoff;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::rate_limit::{sleep_cancellable, RateLimiter};
use crate::store::ResultStore;
use crate::traits::SearchProvider;

/// Result of fetching one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub site: Site,
    pub search_term: String,
    /// Records received from the provider (after truncation to the ceiling).
    pub total_collected: usize,
    /// Of those, how many were new to the store.
    pub total_inserted: usize,
    pub retries_exhausted: bool,
    pub cancelled: bool,
    pub error: Option<ErrorKind>,
    pub last_error: Option<String>,
    pub provider_calls: u32,
    pub retries: u32,
}

impl FetchOutcome {
    fn new(request: &SearchRequest) -> Self {
        Self {
            site: request.site(),
            search_term: request.search_term().to_string(),
            total_collected: 0,
            total_inserted: 0,
            retries_exhausted: false,
            cancelled: false,
            error: None,
            last_error: None,
            provider_calls: 0,
            retries: 0,
        }
    }

    /// Finished without cancellation or exhausted retries.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && !self.retries_exhausted
    }
}

pub struct BatchFetcher {
    store: Arc<ResultStore>,
    limiter: Arc<RateLimiter>,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl BatchFetcher {
    pub fn new(
        store: Arc<ResultStore>,
        limiter: Arc<RateLimiter>,
        reporter: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            limiter,
            reporter,
            cancel,
        }
    }

    pub async fn fetch(
        &self,
        request: &SearchRequest,
        provider: &dyn SearchProvider,
        config: &RetryConfig,
    ) -> FetchOutcome {
        let backoff = Backoff::from_config(config);
        let wanted = request.results_wanted();
        let site = request.site();
        let term = request.search_term().to_string();

        let mut outcome = FetchOutcome::new(request);
        let mut offset: usize = 0;
        let mut attempt: u32 = 0;

        while outcome.total_collected < wanted {
            let limit = config.batch_size.min(wanted - outcome.total_collected);

            let permit = match self.limiter.acquire(site, &self.cancel).await {
                Ok(permit) => permit,
                Err(_) => {
                    self.mark_cancelled(&mut outcome);
                    break;
                }
            };

            // The opening call of a combination goes out immediately.
            if outcome.provider_calls > 0 {
                let delay = backoff.next_delay(attempt, config.base_sleep);
                self.reporter.on_event(&ProgressEvent::Sleeping {
                    search_term: term.clone(),
                    site,
                    offset,
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
                if sleep_cancellable(delay, &self.cancel).await.is_err() {
                    self.mark_cancelled(&mut outcome);
                    break;
                }
            } else if self.cancel.is_cancelled() {
                self.mark_cancelled(&mut outcome);
                break;
            }

            self.reporter.on_event(&ProgressEvent::BatchRequested {
                search_term: term.clone(),
                site,
                offset,
                limit,
                attempt,
            });
            outcome.provider_calls += 1;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(JobsError::Cancelled),
                r = tokio::time::timeout(config.request_timeout, provider.search(request, offset, limit)) => {
                    match r {
                        Ok(Ok(batch)) => Ok(batch),
                        Ok(Err(e)) => Err(JobsError::Provider(e)),
                        Err(_) => Err(JobsError::Provider(ProviderError::Timeout(config.request_timeout))),
                    }
                }
            };
            drop(permit);

            match result {
                Ok(mut batch) => {
                    batch.attempt = attempt;
                    if batch.is_empty() {
                        self.reporter.on_event(&ProgressEvent::SupplyExhausted {
                            search_term: term.clone(),
                            site,
                            collected: outcome.total_collected,
                            wanted,
                        });
                        outcome.error = None;
                        outcome.last_error = None;
                        break;
                    }

                    if batch.returned_count() > limit {
                        debug!(%site, returned = batch.returned_count(), limit, "Truncating oversized batch");
                        batch.records.truncate(limit);
                    }
                    let returned = batch.returned_count();
                    let inserted = self.store.append(batch.records);

                    outcome.total_collected += returned;
                    outcome.total_inserted += inserted;
                    self.reporter.on_event(&ProgressEvent::BatchFetched {
                        search_term: term.clone(),
                        site,
                        offset,
                        requested: limit,
                        returned,
                        inserted,
                        collected: outcome.total_collected,
                        wanted,
                    });
                    offset = offset.saturating_add(returned);
                    attempt = 0;
                    outcome.error = None;
                    outcome.last_error = None;
                }
                Err(JobsError::Provider(e)) => {
                    attempt += 1;
                    outcome.retries += 1;
                    outcome.error = Some(e.kind());
                    outcome.last_error = Some(e.to_string());
                    self.reporter.on_event(&ProgressEvent::BatchFailed {
                        search_term: term.clone(),
                        site,
                        offset,
                        attempt,
                        max_retries: config.max_retries,
                        error_kind: e.kind(),
                        error: e.to_string(),
                    });
                    if attempt > config.max_retries {
                        outcome.retries_exhausted = true;
                        self.reporter.on_event(&ProgressEvent::RetriesExhausted {
                            search_term: term.clone(),
                            site,
                            offset,
                            attempts: attempt,
                        });
                        break;
                    }
                }
                Err(_) => {
                    self.mark_cancelled(&mut outcome);
                    break;
                }
            }
        }

        outcome
    }

    fn mark_cancelled(&self, outcome: &mut FetchOutcome) {
        outcome.cancelled = true;
        outcome.error = Some(ErrorKind::Cancelled);
        self.reporter.on_event(&ProgressEvent::Cancelled {
            search_term: outcome.search_term.clone(),
            site: outcome.site,
            collected: outcome.total_collected,
        });
    }
}
