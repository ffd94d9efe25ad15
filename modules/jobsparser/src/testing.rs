// Test doubles for the fetch engine.
//
// One double per trait boundary:
// - ScriptedProvider (SearchProvider): replays queued responses and logs calls
// - StaticFactory (ProviderFactory): fixed site to provider map
// - RecordingReporter (ProgressReporter): keeps every event for assertions
//
// Plus helpers for building job records.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jobsparser_common::{
    BatchResult, JobRecord, JobsError, ProviderError, Result, SearchRequest, Site,
};

use crate::progress::{ProgressEvent, ProgressReporter};
use crate::traits::{ProviderFactory, SearchProvider};

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

pub fn job(site: Site, id: &str) -> JobRecord {
    let mut record = JobRecord::new(
        site,
        id,
        format!("Job {id}"),
        format!("https://{}.example.com/jobs/{id}", site.as_str()),
    );
    record.company = Some("Acme".to_string());
    record
}

/// `count` records with ids `{site}-{start}` .. `{site}-{start + count - 1}`.
pub fn job_batch(site: Site, start: usize, count: usize) -> Vec<JobRecord> {
    (start..start + count)
        .map(|i| job(site, &format!("{}-{i}", site.as_str())))
        .collect()
}

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

enum Step {
    Ok(Vec<JobRecord>),
    Err(ProviderError),
    Hang,
}

/// Replays scripted responses in order. Once the script runs out it repeats
/// the fallback error if one was set, otherwise returns empty batches.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    fallback: Option<ProviderError>,
    calls: Mutex<Vec<(String, usize, usize)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then_ok(self, records: Vec<JobRecord>) -> Self {
        self.push(Step::Ok(records))
    }

    pub fn then_err(self, err: ProviderError) -> Self {
        self.push(Step::Err(err))
    }

    /// The next call never completes on its own.
    pub fn then_hang(self) -> Self {
        self.push(Step::Hang)
    }

    pub fn always_err(mut self, err: ProviderError) -> Self {
        self.fallback = Some(err);
        self
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.1).collect()
    }

    pub fn limits(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.2).collect()
    }

    pub fn terms(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.0.clone()).collect()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    async fn search(
        &self,
        request: &SearchRequest,
        offset: usize,
        limit: usize,
    ) -> std::result::Result<BatchResult, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.search_term().to_string(), offset, limit));

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Ok(records)) => Ok(BatchResult::new(records, limit)),
            Some(Step::Err(e)) => Err(e),
            Some(Step::Hang) => std::future::pending().await,
            None => match &self.fallback {
                Some(e) => Err(e.clone()),
                None => Ok(BatchResult::new(Vec::new(), limit)),
            },
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// StaticFactory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StaticFactory {
    providers: HashMap<Site, Arc<dyn SearchProvider>>,
}

impl StaticFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, site: Site, provider: Arc<dyn SearchProvider>) -> Self {
        self.providers.insert(site, provider);
        self
    }
}

impl ProviderFactory for StaticFactory {
    fn provider(&self, site: Site) -> Result<Arc<dyn SearchProvider>> {
        self.providers
            .get(&site)
            .cloned()
            .ok_or_else(|| JobsError::InvalidConfig(format!("no provider registered for {site}")))
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl ProgressReporter for RecordingReporter {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
