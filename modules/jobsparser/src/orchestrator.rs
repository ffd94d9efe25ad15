//! Runs every (search term, site) combination and writes the results.
//!
//! Combinations are built term-major with sites in the inner loop. With
//! `concurrency > 1` up to that many run at once; outcomes still come back in
//! submission order. A failing combination is recorded and the run moves on.
//! Only bad configuration and a failed final write abort the run.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use jobsparser_common::{Result, SearchConfig, SearchRequest, Site};

use crate::fetcher::{BatchFetcher, FetchOutcome};
use crate::output::Destination;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::rate_limit::RateLimiter;
use crate::store::ResultStore;
use crate::summary::RunSummary;
use crate::traits::{ProviderFactory, SearchProvider};

pub struct Orchestrator {
    run_id: String,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        run_id: impl Into<String>,
        reporter: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            reporter,
            cancel,
        }
    }

    pub async fn run(
        &self,
        config: &SearchConfig,
        factory: &dyn ProviderFactory,
    ) -> Result<RunSummary> {
        let started_at = Utc::now();
        config.validate()?;

        // Resolve every site before the first request goes out.
        let sites = config.unique_sites();
        let mut providers: HashMap<Site, Arc<dyn SearchProvider>> = HashMap::new();
        for site in &sites {
            providers.insert(*site, factory.provider(*site)?);
        }

        let mut requests = Vec::new();
        for term in config.terms() {
            for site in &sites {
                requests.push(SearchRequest::new(
                    term.clone(),
                    *site,
                    config.template.clone(),
                )?);
            }
        }

        let total = requests.len();
        self.reporter.on_event(&ProgressEvent::RunStarted {
            run_id: self.run_id.clone(),
            combinations: total,
        });

        let store = Arc::new(ResultStore::new());
        let fetcher = BatchFetcher::new(
            store.clone(),
            Arc::new(RateLimiter::new()),
            self.reporter.clone(),
            self.cancel.clone(),
        );
        let destination = Destination::for_config(config);
        let checkpoint = config
            .flush_each_combination
            .then(|| destination.checkpoint_path(&self.run_id));

        let fetcher = &fetcher;
        let providers = &providers;
        let combinations = stream::iter(requests.into_iter().enumerate())
            .map(move |(index, request)| async move {
                // Nothing new starts once the run is cancelled.
                if self.cancel.is_cancelled() {
                    return None;
                }
                self.reporter.on_event(&ProgressEvent::CombinationStarted {
                    index,
                    total,
                    search_term: request.search_term().to_string(),
                    site: request.site(),
                });
                let provider = providers.get(&request.site())?;
                let outcome = fetcher.fetch(&request, provider.as_ref(), &config.retry).await;
                Some((index, outcome))
            })
            .buffered(config.concurrency);
        let mut combinations = std::pin::pin!(combinations);

        let mut outcomes: Vec<FetchOutcome> = Vec::with_capacity(total);
        while let Some(finished) = combinations.next().await {
            let Some((index, outcome)) = finished else {
                continue;
            };
            self.reporter.on_event(&ProgressEvent::CombinationFinished {
                index,
                total,
                outcome: outcome.clone(),
            });
            outcomes.push(outcome);

            if let Some(path) = &checkpoint {
                match store.checkpoint(path) {
                    Ok(()) => self.reporter.on_event(&ProgressEvent::CheckpointWritten {
                        path: path.clone(),
                        records: store.len(),
                    }),
                    Err(e) => warn!(error = %e, "Checkpoint write failed, continuing"),
                }
            }
        }

        let output_path = store.flush(&destination)?;
        let total_records = store.len();
        self.reporter.on_event(&ProgressEvent::Flushed {
            path: output_path.clone(),
            records: total_records,
        });

        if let Some(path) = &checkpoint {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Could not remove checkpoint"),
            }
        }

        let cancelled = self.cancel.is_cancelled();
        info!(
            run_id = %self.run_id,
            combinations = outcomes.len(),
            records = total_records,
            cancelled,
            "Run finished"
        );

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            outcomes,
            total_records,
            output_path,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
