//! ZipRecruiter backend for [`SearchProvider`].
//!
//! The jobs-app API pages with continuation tokens rather than offsets. The
//! provider keeps one cursor per distinct query, buffering listings so that
//! an `(offset, limit)` call continues from where the previous one stopped.
//! A call for an earlier offset rewinds the cursor and walks forward again.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use jobsparser_common::{
    BatchResult, JobRecord, JobType, JobsError, ProviderError, Result, SearchRequest, Site,
};
use ziprecruiter_client::{JobsPage, SearchParams, ZipJob, ZipRecruiterClient, ZipRecruiterError};

use crate::traits::SearchProvider;

/// One page fetch against the API. Split out so pagination can be tested
/// without the network.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn page(
        &self,
        params: &SearchParams,
        continue_from: Option<&str>,
    ) -> std::result::Result<JobsPage, ZipRecruiterError>;
}

#[async_trait]
impl PageSource for ZipRecruiterClient {
    async fn page(
        &self,
        params: &SearchParams,
        continue_from: Option<&str>,
    ) -> std::result::Result<JobsPage, ZipRecruiterError> {
        self.search_page(params, continue_from).await
    }
}

#[derive(Default)]
struct Cursor {
    /// Absolute offset of the first buffered listing.
    position: usize,
    pending: VecDeque<ZipJob>,
    token: Option<String>,
    started: bool,
    done: bool,
}

pub struct ZipRecruiterProvider<S: PageSource = ZipRecruiterClient> {
    source: S,
    request_timeout: Duration,
    cursors: Mutex<HashMap<SearchParams, Cursor>>,
}

impl ZipRecruiterProvider<ZipRecruiterClient> {
    pub fn new(proxy: Option<&str>, request_timeout: Duration) -> Result<Self> {
        let client = ZipRecruiterClient::new(proxy, request_timeout)
            .map_err(|e| JobsError::InvalidConfig(e.to_string()))?;
        Ok(Self::with_source(client, request_timeout))
    }
}

impl<S: PageSource> ZipRecruiterProvider<S> {
    pub fn with_source(source: S, request_timeout: Duration) -> Self {
        Self {
            source,
            request_timeout,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    fn provider_error(&self, err: ZipRecruiterError) -> ProviderError {
        match err {
            ZipRecruiterError::RateLimited => {
                ProviderError::RateLimited("429 response from ZipRecruiter".to_string())
            }
            ZipRecruiterError::Timeout(_) => ProviderError::Timeout(self.request_timeout),
            ZipRecruiterError::Parse(msg) => ProviderError::Parse(msg),
            other => ProviderError::Network(other.to_string()),
        }
    }
}

#[async_trait]
impl<S: PageSource> SearchProvider for ZipRecruiterProvider<S> {
    async fn search(
        &self,
        request: &SearchRequest,
        offset: usize,
        limit: usize,
    ) -> std::result::Result<BatchResult, ProviderError> {
        let params = search_params(request);
        let mut cursors = self.cursors.lock().await;
        let cursor = cursors.entry(params.clone()).or_default();

        if offset < cursor.position {
            debug!(offset, position = cursor.position, "Rewinding ZipRecruiter cursor");
            *cursor = Cursor::default();
        }

        loop {
            while cursor.position < offset && cursor.pending.pop_front().is_some() {
                cursor.position += 1;
            }
            let ready = cursor.position == offset && cursor.pending.len() >= limit;
            if ready || cursor.done {
                break;
            }

            let token = if cursor.started { cursor.token.as_deref() } else { None };
            let page = self
                .source
                .page(&params, token)
                .await
                .map_err(|e| self.provider_error(e))?;

            cursor.started = true;
            cursor.done = page.is_last();
            cursor.token = page.continue_token.clone();
            cursor.pending.extend(page.jobs);
        }

        let take = if cursor.position == offset {
            limit.min(cursor.pending.len())
        } else {
            0
        };
        let records: Vec<JobRecord> = cursor
            .pending
            .drain(..take)
            .map(|job| to_record(&job))
            .collect();
        cursor.position += take;

        Ok(BatchResult::new(records, limit))
    }

    fn name(&self) -> &str {
        "zip_recruiter"
    }
}

fn search_params(request: &SearchRequest) -> SearchParams {
    let filters = request.params();
    let mut params = SearchParams::new(request.search_term(), request.location());
    if let Some(hours) = filters.hours_old {
        params = params.with_hours_old(hours);
    }
    params.employment_type = filters.job_type.map(|t| employment_type(t).to_string());
    params.radius = filters.distance;
    params
}

fn employment_type(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Fulltime => "full_time",
        JobType::Parttime => "part_time",
        JobType::Contract => "contract",
        JobType::Internship => "internship",
    }
}

fn to_record(job: &ZipJob) -> JobRecord {
    let mut record = JobRecord::new(
        Site::ZipRecruiter,
        format!("zr-{}", job.listing_key),
        job.name.clone().unwrap_or_else(|| "N/A".to_string()),
        job.job_url(ziprecruiter_client::BASE_URL),
    );
    record.company = job.company_name().map(str::to_string);
    record.location = job.location_label();
    record.posted_date = job.posted_date();
    record.description = job
        .job_description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let extra = &mut record.extra;
    if let Some(kind) = job.employment_type.as_deref() {
        extra.insert("job_type".into(), kind.replace('_', "").to_lowercase());
    }
    if let Some(interval) = job.compensation_interval() {
        extra.insert("interval".into(), interval.to_string());
    }
    if let Some(min) = job.compensation_min {
        extra.insert("min_amount".into(), (min as i64).to_string());
    }
    if let Some(max) = job.compensation_max {
        extra.insert("max_amount".into(), (max as i64).to_string());
    }
    if let Some(currency) = job.compensation_currency.as_deref() {
        extra.insert("currency".into(), currency.to_string());
    }
    if let Some(listing_type) = job.buyer_type.as_deref() {
        extra.insert("listing_type".into(), listing_type.to_string());
    }
    extra.insert("country".into(), job.country_label().to_string());
    record
}
