use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use jobsparser_common::{JobKey, JobRecord, JobsError, Result};

use crate::output::{self, Destination};

/// Accumulates job records for a run, keeping the first record seen for each
/// (site, id). Safe to share between concurrent fetchers: the duplicate check
/// and the insert happen under one lock.
#[derive(Default)]
pub struct ResultStore {
    inner: Mutex<Accumulated>,
}

#[derive(Default)]
struct Accumulated {
    seen: HashSet<JobKey>,
    records: Vec<JobRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch in order. Returns how many records were new.
    pub fn append(&self, batch: impl IntoIterator<Item = JobRecord>) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut inserted = 0;
        for record in batch {
            if inner.seen.insert(record.key()) {
                inner.records.push(record);
                inserted += 1;
            } else {
                debug!(site = %record.site, id = %record.id, "Duplicate job skipped");
            }
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the accumulated records in insertion order.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).records.clone()
    }

    /// Write everything accumulated so far to a new file under `dest`.
    pub fn flush(&self, dest: &Destination) -> Result<PathBuf> {
        let records = self.snapshot();
        let path = output::write_new(dest, &records).map_err(|e| JobsError::io(dest.dir(), e))?;
        info!(path = %path.display(), records = records.len(), "Results flushed");
        Ok(path)
    }

    /// Overwrite `path` with everything accumulated so far.
    pub fn checkpoint(&self, path: &Path) -> Result<()> {
        let records = self.snapshot();
        output::write_replace(path, &records).map_err(|e| JobsError::io(path, e))?;
        debug!(path = %path.display(), records = records.len(), "Checkpoint written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsparser_common::Site;
    use std::sync::Arc;

    fn job(site: Site, id: &str) -> JobRecord {
        JobRecord::new(site, id, format!("Job {id}"), format!("https://example.com/{id}"))
    }

    #[test]
    fn same_key_is_stored_once() {
        let store = ResultStore::new();
        assert_eq!(store.append(vec![job(Site::Linkedin, "1")]), 1);
        assert_eq!(store.append(vec![job(Site::Linkedin, "1")]), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicates_inside_one_batch_are_dropped() {
        let store = ResultStore::new();
        let inserted = store.append(vec![
            job(Site::Indeed, "a"),
            job(Site::Indeed, "b"),
            job(Site::Indeed, "a"),
        ]);
        assert_eq!(inserted, 2);
    }

    #[test]
    fn first_record_wins() {
        let store = ResultStore::new();
        let mut first = job(Site::Indeed, "a");
        first.title = "original".to_string();
        let mut second = job(Site::Indeed, "a");
        second.title = "replacement".to_string();
        store.append(vec![first]);
        store.append(vec![second]);
        assert_eq!(store.snapshot()[0].title, "original");
    }

    #[test]
    fn cross_site_duplicates_are_kept() {
        let store = ResultStore::new();
        store.append(vec![job(Site::Linkedin, "7"), job(Site::Glassdoor, "7")]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let store = ResultStore::new();
        store.append(vec![job(Site::Indeed, "3"), job(Site::Indeed, "1")]);
        store.append(vec![job(Site::Indeed, "2")]);
        let ids: Vec<String> = store.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn concurrent_appends_never_admit_duplicates() {
        let store = Arc::new(ResultStore::new());
        let inserted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    scope.spawn(move || {
                        (0..200)
                            .map(|i| store.append(vec![job(Site::Google, &i.to_string())]))
                            .sum::<usize>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(inserted, 200);
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn flushing_twice_writes_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Destination::new(dir.path(), "dev london");
        let store = ResultStore::new();
        store.append(vec![job(Site::Linkedin, "1"), job(Site::Indeed, "2")]);

        let first = store.flush(&dest).unwrap();
        let second = store.flush(&dest).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }

    #[test]
    fn flush_to_unwritable_dir_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let store = ResultStore::new();
        let err = store.flush(&Destination::new(&blocker, "x")).unwrap_err();
        assert!(matches!(err, JobsError::Io { .. }));
    }
}
