use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jobsparser::{DefaultProviderFactory, FanoutReporter, Orchestrator, RunLog, TracingReporter};
use jobsparser_common::{
    ExperienceLevel, JobType, RetryConfig, SearchConfig, SearchTemplate, Site,
};

/// Fetch job listings for every search term on every site and write one CSV.
#[derive(Parser, Debug)]
#[command(name = "jobsparser", version, about)]
struct Cli {
    /// Search term, passed through as-is; repeat the flag for several
    #[arg(long = "search-term", env = "JOBSPARSER_SEARCH_TERM", required = true)]
    search_terms: Vec<String>,

    /// Location to search around
    #[arg(long, env = "JOBSPARSER_LOCATION")]
    location: String,

    /// Site to search (linkedin, indeed, glassdoor, google, zip_recruiter); repeat for several
    #[arg(
        long = "site",
        env = "JOBSPARSER_SITES",
        value_delimiter = ',',
        default_value = "zip_recruiter"
    )]
    sites: Vec<Site>,

    /// Records wanted per (term, site)
    #[arg(long, env = "JOBSPARSER_RESULTS_WANTED", default_value_t = 100)]
    results_wanted: usize,

    /// Search radius in miles
    #[arg(long, env = "JOBSPARSER_DISTANCE", default_value_t = 25)]
    distance: u32,

    /// fulltime, parttime, contract or internship
    #[arg(long, env = "JOBSPARSER_JOB_TYPE", default_value = "fulltime")]
    job_type: JobType,

    #[arg(long, env = "JOBSPARSER_COUNTRY", default_value = "UK")]
    country: String,

    /// Fetch full descriptions where the site needs an extra request for them
    #[arg(long, overrides_with = "no_fetch_description")]
    fetch_description: bool,

    #[arg(long = "no-fetch-description", overrides_with = "fetch_description")]
    no_fetch_description: bool,

    /// Proxy ("host:port" or URL); repeat for several
    #[arg(long = "proxies", env = "JOBSPARSER_PROXIES", value_delimiter = ',')]
    proxies: Vec<String>,

    /// Records asked for per provider call
    #[arg(long, env = "JOBSPARSER_BATCH_SIZE", default_value_t = 30)]
    batch_size: usize,

    /// Base seconds between provider calls
    #[arg(long, env = "JOBSPARSER_SLEEP_TIME", default_value_t = 100)]
    sleep_time: u64,

    /// Retries per offset before a combination is given up on
    #[arg(long, env = "JOBSPARSER_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Only listings posted within this many hours
    #[arg(long, env = "JOBSPARSER_HOURS_OLD")]
    hours_old: Option<u32>,

    #[arg(long, env = "JOBSPARSER_OUTPUT_DIR", default_value = "data")]
    output_dir: PathBuf,

    /// LinkedIn experience level filter; repeat for several
    #[arg(long = "linkedin-experience-level", value_delimiter = ',')]
    linkedin_experience_levels: Vec<ExperienceLevel>,

    /// Combinations fetched at once
    #[arg(long, env = "JOBSPARSER_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Seconds before a single provider call is abandoned
    #[arg(long, env = "JOBSPARSER_REQUEST_TIMEOUT", default_value_t = 120)]
    request_timeout: u64,

    /// Upper bound in seconds on any single sleep
    #[arg(long, env = "JOBSPARSER_MAX_DELAY", default_value_t = 3600)]
    max_delay: u64,

    /// Rewrite a checkpoint CSV after every finished combination
    #[arg(long, env = "JOBSPARSER_FLUSH_EACH_COMBINATION")]
    flush_each_combination: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> SearchConfig {
        let fetch_description = self.fetch_description || !self.no_fetch_description;
        let template = SearchTemplate {
            location: self.location,
            results_wanted: self.results_wanted,
            job_type: Some(self.job_type),
            distance: Some(self.distance),
            country: Some(self.country),
            hours_old: self.hours_old,
            fetch_description,
            proxies: self.proxies,
            experience_levels: self
                .linkedin_experience_levels
                .into_iter()
                .collect::<BTreeSet<_>>(),
        };
        SearchConfig {
            search_terms: self.search_terms,
            sites: self.sites,
            template,
            retry: RetryConfig {
                batch_size: self.batch_size,
                base_sleep: Duration::from_secs(self.sleep_time),
                max_retries: self.max_retries,
                max_delay: Duration::from_secs(self.max_delay),
                request_timeout: Duration::from_secs(self.request_timeout),
                ..RetryConfig::default()
            },
            output_dir: self.output_dir,
            concurrency: self.concurrency,
            flush_each_combination: self.flush_each_combination,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "jobsparser=debug" } else { "jobsparser=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = cli.into_config();
    config.log_redacted();

    let run_id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing with what has been collected");
                cancel.cancel();
            }
        });
    }

    let run_log = Arc::new(RunLog::new(run_id.clone()));
    let reporter = FanoutReporter::new()
        .with(Arc::new(TracingReporter))
        .with(run_log.clone());

    let factory =
        DefaultProviderFactory::new(config.template.proxies.clone(), config.retry.request_timeout);
    let orchestrator = Orchestrator::new(run_id, Arc::new(reporter), cancel);

    let summary = orchestrator
        .run(&config, &factory)
        .await
        .context("Job search run failed")?;

    if let Err(e) = run_log.save(&config.output_dir, &summary) {
        warn!(error = %e, "Failed to save run log");
    }

    info!("{summary}");
    println!("{}", summary.output_path.display());
    Ok(())
}
