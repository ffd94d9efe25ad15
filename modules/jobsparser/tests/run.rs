//! Whole-run behavior: orchestrator, fetcher, store and CSV output together,
//! with scripted providers and paused time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use jobsparser::testing::{job_batch, RecordingReporter, ScriptedProvider, StaticFactory};
use jobsparser::{FanoutReporter, Orchestrator, ProgressEvent, ProgressReporter, RunLog};
use jobsparser_common::{ProviderError, RetryConfig, SearchConfig, SearchTemplate, Site};

fn config(dir: &Path, terms: &[&str], sites: &[Site], wanted: usize, batch: usize) -> SearchConfig {
    SearchConfig {
        search_terms: terms.iter().map(|t| t.to_string()).collect(),
        sites: sites.to_vec(),
        template: SearchTemplate::builder()
            .location("London")
            .results_wanted(wanted)
            .build(),
        retry: RetryConfig {
            batch_size: batch,
            ..RetryConfig::default()
        },
        output_dir: dir.to_path_buf(),
        concurrency: 1,
        flush_each_combination: false,
    }
}

fn csv_rows(path: &Path) -> Vec<(String, String)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].to_string())
        })
        .collect()
}

/// Cancels the run when the fetcher is about to sleep before `offset` of `term`.
struct CancelBeforeOffset {
    term: &'static str,
    offset: usize,
    token: CancellationToken,
}

impl ProgressReporter for CancelBeforeOffset {
    fn on_event(&self, event: &ProgressEvent) {
        if let ProgressEvent::Sleeping {
            search_term, offset, ..
        } = event
        {
            if search_term == self.term && *offset == self.offset {
                self.token.cancel();
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn fetches_until_results_wanted() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .then_ok(job_batch(Site::Linkedin, 0, 30))
            .then_ok(job_batch(Site::Linkedin, 30, 20))
            .then_ok(Vec::new()),
    );
    let factory = StaticFactory::new().with(Site::Linkedin, provider.clone());
    let reporter = Arc::new(RecordingReporter::new());

    let cfg = config(dir.path(), &["Python Developer"], &[Site::Linkedin], 50, 30);
    let summary = Orchestrator::new("e2e", reporter.clone(), CancellationToken::new())
        .run(&cfg, &factory)
        .await
        .unwrap();

    assert_eq!(summary.total_records, 50);
    assert_eq!(provider.offsets(), vec![0, 30]);
    assert_eq!(provider.limits(), vec![30, 20]);
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].retries, 0);
    assert_eq!(summary.outcomes[0].total_collected, 50);
    assert!(!summary.cancelled);

    let rows = csv_rows(&summary.output_path);
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[0], ("linkedin".to_string(), "linkedin-0".to_string()));
    assert_eq!(rows[49].1, "linkedin-49");

    let name = summary.output_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("jobs_python-developer-london-linkedin_"), "{name}");
    assert_eq!(reporter.count(|e| matches!(e, ProgressEvent::BatchFailed { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_flushes_what_was_collected() {
    let dir = tempfile::tempdir().unwrap();
    // Three combinations of three 20-record batches each, unique ids throughout.
    let mut scripted = ScriptedProvider::new();
    for start in (0..180).step_by(20) {
        scripted = scripted.then_ok(job_batch(Site::Linkedin, start, 20));
    }
    let provider = Arc::new(scripted);
    let factory = StaticFactory::new().with(Site::Linkedin, provider.clone());

    let cancel = CancellationToken::new();
    let recorder = Arc::new(RecordingReporter::new());
    let reporter = FanoutReporter::new().with(recorder.clone()).with(Arc::new(CancelBeforeOffset {
        term: "c",
        offset: 40,
        token: cancel.clone(),
    }));

    let cfg = config(dir.path(), &["a", "b", "c"], &[Site::Linkedin], 60, 20);
    let summary = Orchestrator::new("cancelled", Arc::new(reporter), cancel)
        .run(&cfg, &factory)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.outcomes[0].is_complete());
    assert!(summary.outcomes[1].is_complete());
    assert!(summary.outcomes[2].cancelled);
    assert_eq!(summary.outcomes[2].total_collected, 40);
    assert_eq!(provider.calls(), 8);

    let rows = csv_rows(&summary.output_path);
    assert_eq!(rows.len(), 160);
    let expected: Vec<String> = (0..160).map(|i| format!("linkedin-{i}")).collect();
    let ids: Vec<String> = rows.into_iter().map(|(_, id)| id).collect();
    assert_eq!(ids, expected);
    assert_eq!(recorder.count(|e| matches!(e, ProgressEvent::Cancelled { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_do_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let flaky = Arc::new(
        ScriptedProvider::new().always_err(ProviderError::RateLimited("429".into())),
    );
    let healthy = Arc::new(ScriptedProvider::new().then_ok(job_batch(Site::Indeed, 0, 10)));
    let factory = StaticFactory::new()
        .with(Site::Linkedin, flaky.clone())
        .with(Site::Indeed, healthy);

    let mut cfg = config(dir.path(), &["rust"], &[Site::Linkedin, Site::Indeed], 10, 10);
    cfg.retry.max_retries = 2;
    cfg.retry.base_sleep = Duration::from_secs(5);

    let run_log = Arc::new(RunLog::new("retries"));
    let summary = Orchestrator::new("retries", run_log.clone(), CancellationToken::new())
        .run(&cfg, &factory)
        .await
        .unwrap();

    assert_eq!(flaky.calls(), 3);
    assert!(summary.outcomes[0].retries_exhausted);
    assert_eq!(summary.outcomes[0].retries, 3);
    assert!(summary.outcomes[1].is_complete());
    assert_eq!(csv_rows(&summary.output_path).len(), 10);

    let log_path = run_log.save(dir.path(), &summary).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(log_path).unwrap()).unwrap();
    let kinds: Vec<&str> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == "batch_failed").count(), 3);
    assert!(kinds.contains(&"retries_exhausted"));
    assert_eq!(kinds.last(), Some(&"flushed"));
}
