use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::JobsError;

// --- Enums ---

/// Job board a search is run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Linkedin,
    Indeed,
    Glassdoor,
    Google,
    ZipRecruiter,
}

impl Site {
    pub const ALL: [Site; 5] = [
        Site::Linkedin,
        Site::Indeed,
        Site::Glassdoor,
        Site::Google,
        Site::ZipRecruiter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Linkedin => "linkedin",
            Site::Indeed => "indeed",
            Site::Glassdoor => "glassdoor",
            Site::Google => "google",
            Site::ZipRecruiter => "zip_recruiter",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = JobsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "linkedin" => Ok(Site::Linkedin),
            "indeed" => Ok(Site::Indeed),
            "glassdoor" => Ok(Site::Glassdoor),
            "google" => Ok(Site::Google),
            "zip_recruiter" | "ziprecruiter" => Ok(Site::ZipRecruiter),
            other => Err(JobsError::InvalidConfig(format!("unknown site: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Fulltime,
    Parttime,
    Contract,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Fulltime => "fulltime",
            JobType::Parttime => "parttime",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = JobsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "fulltime" => Ok(JobType::Fulltime),
            "parttime" => Ok(JobType::Parttime),
            "contract" => Ok(JobType::Contract),
            "internship" => Ok(JobType::Internship),
            other => Err(JobsError::InvalidConfig(format!("unknown job type: {other}"))),
        }
    }
}

/// LinkedIn seniority filter. Other sites ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Internship,
    EntryLevel,
    Associate,
    MidSenior,
    Director,
    Executive,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Internship => "internship",
            ExperienceLevel::EntryLevel => "entry_level",
            ExperienceLevel::Associate => "associate",
            ExperienceLevel::MidSenior => "mid_senior",
            ExperienceLevel::Director => "director",
            ExperienceLevel::Executive => "executive",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = JobsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "internship" => Ok(ExperienceLevel::Internship),
            "entry_level" => Ok(ExperienceLevel::EntryLevel),
            "associate" => Ok(ExperienceLevel::Associate),
            "mid_senior" => Ok(ExperienceLevel::MidSenior),
            "director" => Ok(ExperienceLevel::Director),
            "executive" => Ok(ExperienceLevel::Executive),
            other => Err(JobsError::InvalidConfig(format!(
                "unknown experience level: {other}"
            ))),
        }
    }
}

// --- Search request ---

/// Search parameters shared by every (term, site) combination of a run.
#[derive(Debug, Clone, PartialEq, Serialize, TypedBuilder)]
pub struct SearchTemplate {
    #[builder(setter(into))]
    pub location: String,
    pub results_wanted: usize,
    #[builder(default, setter(strip_option))]
    pub job_type: Option<JobType>,
    #[builder(default, setter(strip_option))]
    pub distance: Option<u32>,
    #[builder(default, setter(strip_option, into))]
    pub country: Option<String>,
    #[builder(default, setter(strip_option))]
    pub hours_old: Option<u32>,
    #[builder(default = true)]
    pub fetch_description: bool,
    #[builder(default)]
    pub proxies: Vec<String>,
    #[builder(default)]
    pub experience_levels: BTreeSet<ExperienceLevel>,
}

/// One (search term, site) unit of work. Only constructible through
/// [`SearchRequest::new`], which rejects requests that cannot be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    search_term: String,
    site: Site,
    #[serde(flatten)]
    params: SearchTemplate,
}

impl SearchRequest {
    pub fn new(
        search_term: impl Into<String>,
        site: Site,
        params: SearchTemplate,
    ) -> Result<Self, JobsError> {
        let search_term = search_term.into().trim().to_string();
        if search_term.is_empty() {
            return Err(JobsError::InvalidRequest(
                "search term must not be empty".to_string(),
            ));
        }
        if params.results_wanted == 0 {
            return Err(JobsError::InvalidRequest(format!(
                "results_wanted must be greater than zero (term={search_term:?}, site={site})"
            )));
        }
        Ok(Self {
            search_term,
            site,
            params,
        })
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn site(&self) -> Site {
        self.site
    }

    pub fn location(&self) -> &str {
        &self.params.location
    }

    pub fn results_wanted(&self) -> usize {
        self.params.results_wanted
    }

    pub fn params(&self) -> &SearchTemplate {
        &self.params
    }
}

// --- Job records ---

/// Dedup identity of a record: provider ids are only unique within a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub site: Site,
    pub id: String,
}

/// A normalized job posting returned by a search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub site: Site,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: String,
    pub posted_date: Option<NaiveDate>,
    pub description: Option<String>,
    /// Provider-specific fields passed through to the output untouched.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl JobRecord {
    pub fn new(site: Site, id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            site,
            title: title.into(),
            company: None,
            location: None,
            url: url.into(),
            posted_date: None,
            description: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> JobKey {
        JobKey {
            site: self.site,
            id: self.id.clone(),
        }
    }
}

/// Records returned by a single provider call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub records: Vec<JobRecord>,
    pub requested_count: usize,
    /// Zero-based retry counter of the call that produced this batch.
    pub attempt: u32,
}

impl BatchResult {
    pub fn new(records: Vec<JobRecord>, requested_count: usize) -> Self {
        Self {
            records,
            requested_count,
            attempt: 0,
        }
    }

    pub fn returned_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(results_wanted: usize) -> SearchTemplate {
        SearchTemplate::builder()
            .location("London")
            .results_wanted(results_wanted)
            .build()
    }

    #[test]
    fn site_parses_cli_spellings() {
        assert_eq!("linkedin".parse::<Site>().unwrap(), Site::Linkedin);
        assert_eq!("Zip-Recruiter".parse::<Site>().unwrap(), Site::ZipRecruiter);
        assert_eq!("ziprecruiter".parse::<Site>().unwrap(), Site::ZipRecruiter);
        assert!("monster".parse::<Site>().is_err());
    }

    #[test]
    fn site_round_trips_through_display() {
        for site in Site::ALL {
            assert_eq!(site.to_string().parse::<Site>().unwrap(), site);
        }
    }

    #[test]
    fn job_type_accepts_separators() {
        assert_eq!("full-time".parse::<JobType>().unwrap(), JobType::Fulltime);
        assert_eq!("part_time".parse::<JobType>().unwrap(), JobType::Parttime);
        assert!("gig".parse::<JobType>().is_err());
    }

    #[test]
    fn request_rejects_zero_results_wanted() {
        let err = SearchRequest::new("Python Developer", Site::Linkedin, template(0)).unwrap_err();
        assert!(matches!(err, JobsError::InvalidRequest(_)));
    }

    #[test]
    fn request_rejects_blank_term() {
        let err = SearchRequest::new("   ", Site::Indeed, template(10)).unwrap_err();
        assert!(matches!(err, JobsError::InvalidRequest(_)));
    }

    #[test]
    fn request_trims_term() {
        let req = SearchRequest::new("  Rust  ", Site::Indeed, template(10)).unwrap();
        assert_eq!(req.search_term(), "Rust");
        assert_eq!(req.results_wanted(), 10);
        assert_eq!(req.location(), "London");
    }

    #[test]
    fn key_is_site_scoped() {
        let a = JobRecord::new(Site::Linkedin, "42", "Engineer", "https://a");
        let b = JobRecord::new(Site::Indeed, "42", "Engineer", "https://b");
        assert_ne!(a.key(), b.key());
    }
}
