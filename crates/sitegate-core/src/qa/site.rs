//! HTTP access to the live site.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::executor::USER_AGENT_VALUE;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Status, content type and body of one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    /// Empty when the header is absent.
    pub content_type: String,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Uncached client shared by the audit probes.
pub(crate) fn audit_client(timeout: Duration) -> PipelineResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Http {
            message: format!("failed to create HTTP client: {}", e),
        })
}

#[derive(Debug, Clone)]
pub struct SiteClient {
    client: reqwest::Client,
    base_url: String,
}

impl SiteClient {
    pub fn new(base_url: impl Into<String>) -> PipelineResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> PipelineResult<Self> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: audit_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` on the live site. Any status is a successful fetch; only
    /// transport failures are errors.
    pub async fn fetch(&self, path: &str) -> Result<Fetched, String> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("GET {} failed: {}", path, e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        // A body that cannot be read is treated as empty, not as a failed fetch.
        let body = response.text().await.unwrap_or_default();
        debug!(url = %url, status, "site fetch");
        Ok(Fetched {
            status,
            content_type,
            body,
        })
    }
}
