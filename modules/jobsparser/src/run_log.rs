//! Run log: persisted JSON timeline of every progress event in a run.
//!
//! Each run produces a single `{output_dir}/runs/{run_id}.json` file holding
//! the summary and an ordered list of timestamped events.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::progress::{ProgressEvent, ProgressReporter};
use crate::summary::RunSummary;

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

pub struct RunLog {
    run_id: String,
    started_at: DateTime<Utc>,
    events: Mutex<Vec<RunEvent>>,
}

#[derive(Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    event: ProgressEvent,
}

impl RunLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the run log to JSON under `{output_dir}/runs/`.
    /// Returns the file path on success.
    pub fn save(&self, output_dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
        let dir = output_dir.join("runs");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", self.run_id));
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());

        let output = SerializedRunLog {
            run_id: &self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            summary,
            events: &events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)?;
        info!(path = %path.display(), events = events.len(), "Run log saved");

        Ok(path)
    }
}

impl ProgressReporter for RunLog {
    fn on_event(&self, event: &ProgressEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let seq = events.len() as u32;
        events.push(RunEvent {
            seq,
            ts: Utc::now(),
            event: event.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Serialization wrapper
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    summary: &'a RunSummary,
    events: &'a [RunEvent],
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsparser_common::Site;

    fn summary(run_id: &str) -> RunSummary {
        RunSummary {
            run_id: run_id.to_string(),
            outcomes: Vec::new(),
            total_records: 0,
            output_path: PathBuf::from("jobs.csv"),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn saves_sequenced_events() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new("run-1");
        log.on_event(&ProgressEvent::RunStarted {
            run_id: "run-1".into(),
            combinations: 1,
        });
        log.on_event(&ProgressEvent::SupplyExhausted {
            search_term: "rust".into(),
            site: Site::Indeed,
            collected: 4,
            wanted: 10,
        });
        assert_eq!(log.len(), 2);

        let path = log.save(dir.path(), &summary("run-1")).unwrap();
        assert_eq!(path, dir.path().join("runs").join("run-1.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["run_id"], "run-1");
        let events = json["events"].as_array().unwrap();
        assert_eq!(events[0]["seq"], 0);
        assert_eq!(events[0]["type"], "run_started");
        assert_eq!(events[1]["seq"], 1);
        assert_eq!(events[1]["type"], "supply_exhausted");
        assert_eq!(events[1]["site"], "indeed");
    }

    #[test]
    fn save_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let log = RunLog::new("run-2");
        assert!(log.save(&blocker, &summary("run-2")).is_err());
    }
}
