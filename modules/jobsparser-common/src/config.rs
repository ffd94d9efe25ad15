use std::path::PathBuf;
use std::time::Duration;

use crate::error::{JobsError, Result};
use crate::types::{SearchTemplate, Site};

/// Pacing and retry knobs for the batch fetch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Records asked for per provider call.
    pub batch_size: usize,
    /// Base sleep between provider calls, scaled up on retries.
    pub base_sleep: Duration,
    /// Retries allowed per offset before the combination is given up on.
    pub max_retries: u32,
    /// Exponent ceiling for the backoff factor.
    pub cap_exponent: u32,
    /// Upper bound on any single sleep.
    pub max_delay: Duration,
    /// Deadline for a single provider call.
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            base_sleep: Duration::from_secs(100),
            max_retries: 3,
            cap_exponent: 6,
            max_delay: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Everything a run needs, validated before any network activity.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub search_terms: Vec<String>,
    pub sites: Vec<Site>,
    pub template: SearchTemplate,
    pub retry: RetryConfig,
    pub output_dir: PathBuf,
    /// Combinations fetched at once. 1 = sequential.
    pub concurrency: usize,
    /// Rewrite a checkpoint file after every finished combination.
    pub flush_each_combination: bool,
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.terms().is_empty() {
            return invalid("at least one non-empty search term is required");
        }
        if self.unique_sites().is_empty() {
            return invalid("at least one site is required");
        }
        if self.template.location.trim().is_empty() {
            return invalid("location must not be empty");
        }
        if self.template.results_wanted == 0 {
            return invalid("results_wanted must be greater than zero");
        }
        if self.retry.batch_size == 0 {
            return invalid("batch_size must be greater than zero");
        }
        if self.retry.request_timeout.is_zero() {
            return invalid("request_timeout must be greater than zero");
        }
        if self.retry.max_delay < self.retry.base_sleep {
            return invalid("max_delay must not be shorter than the base sleep time");
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.output_dir.as_os_str().is_empty() {
            return invalid("output_dir must not be empty");
        }
        if let Some(proxy) = self.template.proxies.iter().find(|p| p.trim().is_empty()) {
            return invalid(&format!("proxy entry {proxy:?} is empty"));
        }
        if !self.template.experience_levels.is_empty() && !self.sites.contains(&Site::Linkedin) {
            tracing::warn!("Experience levels only apply to LinkedIn and will be ignored");
        }
        Ok(())
    }

    /// Trimmed search terms with duplicates removed, first occurrence wins.
    pub fn terms(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for term in &self.search_terms {
            let term = term.trim();
            if !term.is_empty() && !out.iter().any(|t| t == term) {
                out.push(term.to_string());
            }
        }
        out
    }

    /// Sites with duplicates removed, first occurrence wins.
    pub fn unique_sites(&self) -> Vec<Site> {
        let mut out = Vec::new();
        for site in &self.sites {
            if !out.contains(site) {
                out.push(*site);
            }
        }
        out
    }

    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  search terms: {:?}", self.terms());
        tracing::info!(
            "  sites: {}",
            self.unique_sites()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        tracing::info!("  location: {}", self.template.location);
        tracing::info!("  results wanted: {}", self.template.results_wanted);
        tracing::info!(
            "  batch size: {}, base sleep: {:?}, max retries: {}",
            self.retry.batch_size,
            self.retry.base_sleep,
            self.retry.max_retries
        );
        tracing::info!("  proxies: {} configured", self.template.proxies.len());
        for proxy in &self.template.proxies {
            tracing::debug!("    {}", redact_proxy(proxy));
        }
        tracing::info!("  output dir: {}", self.output_dir.display());
    }
}

fn invalid(msg: &str) -> Result<()> {
    Err(JobsError::InvalidConfig(msg.to_string()))
}

/// Hide credentials and the tail of the host in a proxy address.
fn redact_proxy(proxy: &str) -> String {
    let host = proxy.rsplit('@').next().unwrap_or(proxy);
    let head: String = host.chars().take(5).collect();
    format!("{head}...({} chars)", host.chars().count())
}
