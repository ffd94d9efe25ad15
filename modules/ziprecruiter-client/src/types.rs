use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /jobs-app/jobs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SearchParams {
    pub search: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<u8>,
}

impl SearchParams {
    pub fn new(search: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    /// The API filters by whole days; anything under a day rounds up to one.
    pub fn with_hours_old(mut self, hours: u32) -> Self {
        self.days = Some((hours / 24).max(1));
        self
    }
}

/// One page of search results plus the token for the next page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobsPage {
    #[serde(default)]
    pub jobs: Vec<ZipJob>,
    #[serde(rename = "continue", default)]
    pub continue_token: Option<String>,
}

impl JobsPage {
    /// True when the API has no further pages for this query.
    pub fn is_last(&self) -> bool {
        self.jobs.is_empty() || self.continue_token.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HiringCompany {
    pub name: Option<String>,
}

/// A single listing as returned by the jobs-app API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZipJob {
    pub listing_key: String,
    pub name: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub hiring_company: Option<HiringCompany>,
    pub job_city: Option<String>,
    pub job_state: Option<String>,
    pub job_country: Option<String>,
    pub employment_type: Option<String>,
    pub posted_time: Option<String>,
    pub compensation_interval: Option<String>,
    pub compensation_min: Option<f64>,
    pub compensation_max: Option<f64>,
    pub compensation_currency: Option<String>,
    pub buyer_type: Option<String>,
}

impl ZipJob {
    pub fn job_url(&self, base_url: &str) -> String {
        format!("{base_url}/jobs//j?lvk={}", self.listing_key)
    }

    pub fn company_name(&self) -> Option<&str> {
        self.hiring_company.as_ref()?.name.as_deref()
    }

    /// "City, ST" from whichever parts are present.
    pub fn location_label(&self) -> Option<String> {
        let parts: Vec<&str> = [self.job_city.as_deref(), self.job_state.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    pub fn posted_date(&self) -> Option<NaiveDate> {
        let raw = self.posted_time.as_deref()?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
    }

    /// The API reports "annual"; everything downstream says "yearly".
    pub fn compensation_interval(&self) -> Option<&str> {
        match self.compensation_interval.as_deref() {
            Some("annual") => Some("yearly"),
            other => other,
        }
    }

    pub fn country_label(&self) -> &'static str {
        if self.job_country.as_deref() == Some("US") {
            "usa"
        } else {
            "canada"
        }
    }
}
