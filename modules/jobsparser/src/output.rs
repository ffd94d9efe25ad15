//! CSV persistence for accumulated job records.
//!
//! Every flush lands in a new `jobs_{slug}_{timestamp}_{suffix}.csv` file so a
//! run never overwrites an earlier one. The slug summarizes the search terms,
//! location and sites for traceability; only the suffix guarantees uniqueness.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use jobsparser_common::{JobRecord, SearchConfig};

/// Fixed leading columns; provider-specific extras follow, sorted by name.
pub const BASE_COLUMNS: [&str; 8] = [
    "site",
    "id",
    "title",
    "company",
    "location",
    "url",
    "date_posted",
    "description",
];

const MAX_SLUG_LEN: usize = 60;
const MAX_NAME_ATTEMPTS: usize = 5;

/// Where a run's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    dir: PathBuf,
    slug: String,
}

impl Destination {
    pub fn new(dir: impl Into<PathBuf>, slug: &str) -> Self {
        Self {
            dir: dir.into(),
            slug: slugify(slug),
        }
    }

    pub fn for_config(config: &SearchConfig) -> Self {
        let sites: Vec<&str> = config.unique_sites().iter().map(|s| s.as_str()).collect();
        let summary = format!(
            "{} {} {}",
            config.terms().join(" "),
            config.template.location,
            sites.join(" ")
        );
        Self::new(&config.output_dir, &summary)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh output path; never the same twice.
    pub fn unique_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        let name = if self.slug.is_empty() {
            format!("jobs_{stamp}_{}.csv", &suffix[..8])
        } else {
            format!("jobs_{}_{stamp}_{}.csv", self.slug, &suffix[..8])
        };
        self.dir.join(name)
    }

    /// Stable path rewritten after each combination when checkpointing is on.
    pub fn checkpoint_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.partial.csv"))
    }
}

/// Lowercase, ascii-alphanumeric words joined by `-`, truncated.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

/// Write `records` to a brand-new file under `dest`. Returns its path.
pub fn write_new(dest: &Destination, records: &[JobRecord]) -> io::Result<PathBuf> {
    fs::create_dir_all(dest.dir())?;
    let mut last_err = None;
    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dest.unique_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                write_records(file, records)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("could not pick a unique output name")))
}

/// Replace the file at `path` atomically (write to a sibling, then rename).
pub fn write_replace(path: &Path, records: &[JobRecord]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    write_records(File::create(&tmp)?, records)?;
    fs::rename(&tmp, path)
}

fn write_records<W: Write>(out: W, records: &[JobRecord]) -> io::Result<()> {
    let extra_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .filter(|k| !BASE_COLUMNS.contains(k))
        .collect();

    let mut writer = csv::Writer::from_writer(out);
    let header: Vec<&str> = BASE_COLUMNS.iter().copied().chain(extra_keys.iter().copied()).collect();
    writer.write_record(&header)?;

    for record in records {
        let date = record
            .posted_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let mut row: Vec<&str> = vec![
            record.site.as_str(),
            record.id.as_str(),
            record.title.as_str(),
            record.company.as_deref().unwrap_or_default(),
            record.location.as_deref().unwrap_or_default(),
            record.url.as_str(),
            date.as_str(),
            record.description.as_deref().unwrap_or_default(),
        ];
        for key in &extra_keys {
            row.push(record.extra.get(*key).map(String::as_str).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsparser_common::Site;

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slugify("Python Developer  London/linkedin"), "python-developer-london-linkedin");
        assert_eq!(slugify("  --C++ & Rust--  "), "c-rust");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn slug_is_truncated() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn unique_paths_differ() {
        let dest = Destination::new("data", "rust london");
        let a = dest.unique_path();
        let b = dest.unique_path();
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("jobs_rust-london_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn extras_become_sorted_columns() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Destination::new(dir.path(), "t");

        let mut a = JobRecord::new(Site::ZipRecruiter, "zr-1", "Engineer", "https://a");
        a.extra.insert("salary_max".into(), "150000".into());
        let mut b = JobRecord::new(Site::ZipRecruiter, "zr-2", "Engineer, Senior", "https://b");
        b.extra.insert("job_type".into(), "fulltime".into());

        let path = write_new(&dest, &[a, b]).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "site,id,title,company,location,url,date_posted,description,job_type,salary_max"
        );
        assert_eq!(lines.next().unwrap(), "zip_recruiter,zr-1,Engineer,,,https://a,,,,150000");
        assert_eq!(
            lines.next().unwrap(),
            "zip_recruiter,zr-2,\"Engineer, Senior\",,,https://b,,,fulltime,"
        );
    }

    #[test]
    fn replace_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.partial.csv");
        let one = vec![JobRecord::new(Site::Indeed, "1", "A", "u")];
        write_replace(&path, &one).unwrap();
        let two = vec![
            JobRecord::new(Site::Indeed, "1", "A", "u"),
            JobRecord::new(Site::Indeed, "2", "B", "u"),
        ];
        write_replace(&path, &two).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
