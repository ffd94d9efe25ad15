pub mod error;
pub mod types;

pub use error::{Result, ZipRecruiterError};
pub use types::{HiringCompany, JobsPage, SearchParams, ZipJob};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

pub const BASE_URL: &str = "https://www.ziprecruiter.com";
const API_URL: &str = "https://api.ziprecruiter.com";

pub struct ZipRecruiterClient {
    client: reqwest::Client,
}

impl ZipRecruiterClient {
    /// Build a client, optionally routed through `proxy` ("host:port" or a full URL).
    pub fn new(proxy: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers())
            .timeout(timeout);

        if let Some(proxy) = proxy {
            let url = if proxy.contains("://") {
                proxy.to_string()
            } else {
                format!("http://{proxy}")
            };
            let proxy_cfg = reqwest::Proxy::all(&url).map_err(|e| ZipRecruiterError::Proxy {
                proxy: proxy.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.proxy(proxy_cfg);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Fetch one page of listings. `continue_from` is the token from the previous page.
    pub async fn search_page(
        &self,
        params: &SearchParams,
        continue_from: Option<&str>,
    ) -> Result<JobsPage> {
        let url = format!("{API_URL}/jobs-app/jobs");
        let mut request = self.client.get(&url).query(params);
        if let Some(token) = continue_from {
            request = request.query(&[("continue_from", token)]);
        }

        tracing::debug!(search = %params.search, location = %params.location, continue_from, "Requesting ZipRecruiter page");
        let resp = request.send().await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ZipRecruiterError::RateLimited);
        }
        if !(status.is_success() || status.is_redirection()) {
            let body = resp.text().await.unwrap_or_default();
            return Err(ZipRecruiterError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let page: JobsPage = serde_json::from_str(&body)?;
        tracing::debug!(count = page.jobs.len(), has_more = !page.is_last(), "Fetched ZipRecruiter page");
        Ok(page)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Job Search/87.0 (iPhone; CPU iOS 16_6_1 like Mac OS X)",
        ),
    );
    headers.insert("accept-language", HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}
