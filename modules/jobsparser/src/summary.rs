use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fetcher::FetchOutcome;

/// What a finished (or cancelled) run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    /// One entry per combination that was started, in submission order.
    pub outcomes: Vec<FetchOutcome>,
    /// Records written to the output file after de-duplication.
    pub total_records: usize,
    pub output_path: PathBuf,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn complete_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_complete()).count()
    }

    pub fn exhausted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.retries_exhausted).count()
    }

    pub fn provider_calls(&self) -> u32 {
        self.outcomes.iter().map(|o| o.provider_calls).sum()
    }

    pub fn retries(&self) -> u32 {
        self.outcomes.iter().map(|o| o.retries).sum()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.cancelled { "Cancelled" } else { "Complete" };
        writeln!(f, "\n=== Job Search {status} ===")?;
        writeln!(f, "Run id:            {}", self.run_id)?;
        writeln!(f, "Combinations:      {}", self.outcomes.len())?;
        writeln!(f, "  finished:        {}", self.complete_count())?;
        writeln!(f, "  retries used up: {}", self.exhausted_count())?;
        writeln!(f, "Provider calls:    {}", self.provider_calls())?;
        writeln!(f, "Retries:           {}", self.retries())?;
        writeln!(f, "Records written:   {}", self.total_records)?;
        writeln!(f, "Output:            {}", self.output_path.display())?;
        let elapsed = self.finished_at - self.started_at;
        writeln!(f, "Elapsed:           {}s", elapsed.num_seconds())?;

        if !self.outcomes.is_empty() {
            writeln!(f, "\nBy combination:")?;
            for o in &self.outcomes {
                let note = match (&o.error, o.cancelled) {
                    (_, true) => " (cancelled)".to_string(),
                    (Some(kind), false) => format!(" ({kind})"),
                    (None, false) => String::new(),
                };
                writeln!(
                    f,
                    "  {:<14} {:<30} {:>5} collected, {:>5} new{}",
                    o.site.as_str(),
                    o.search_term,
                    o.total_collected,
                    o.total_inserted,
                    note
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsparser_common::{ErrorKind, Site};

    fn outcome(site: Site, term: &str, collected: usize) -> FetchOutcome {
        FetchOutcome {
            site,
            search_term: term.to_string(),
            total_collected: collected,
            total_inserted: collected,
            retries_exhausted: false,
            cancelled: false,
            error: None,
            last_error: None,
            provider_calls: 2,
            retries: 1,
        }
    }

    #[test]
    fn totals_and_display() {
        let mut failed = outcome(Site::Indeed, "rust", 0);
        failed.retries_exhausted = true;
        failed.error = Some(ErrorKind::RateLimited);

        let now = Utc::now();
        let summary = RunSummary {
            run_id: "abc".into(),
            outcomes: vec![outcome(Site::Linkedin, "rust", 30), failed],
            total_records: 30,
            output_path: PathBuf::from("data/jobs.csv"),
            cancelled: false,
            started_at: now,
            finished_at: now,
        };

        assert_eq!(summary.complete_count(), 1);
        assert_eq!(summary.exhausted_count(), 1);
        assert_eq!(summary.provider_calls(), 4);
        assert_eq!(summary.retries(), 2);

        let text = summary.to_string();
        assert!(text.contains("=== Job Search Complete ==="));
        assert!(text.contains("Records written:   30"));
        assert!(text.contains("(rate_limited)"));
    }
}
