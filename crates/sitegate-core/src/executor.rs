//! Step executor: one collaborator HTTP call, bounded by a timeout.
//!
//! This is the only place that interprets HTTP status codes for steps.
//! Every failure mode is encoded in [`StepOutcome`]; nothing is returned as
//! an error and there is no retry.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::model::StepResponse;

pub const USER_AGENT_VALUE: &str = concat!("sitegate/", env!("CARGO_PKG_VERSION"));

/// Why a step call did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// No response within the timeout; the request was dropped client-side.
    Timeout { after_ms: u64 },
    /// Connection, TLS or body read failure.
    Network { message: String },
    /// The collaborator answered outside 2xx.
    HttpStatus { status: u16 },
    /// The caller aborted the call.
    Cancelled,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            Self::Network { message } => write!(f, "network error: {}", message),
            Self::HttpStatus { status } => write!(f, "HTTP {}", status),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Normalized result of one step call.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub url: String,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub content_type: Option<String>,
    /// Full response body (empty on timeout / network failure).
    pub body: String,
    pub failure: Option<StepFailure>,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn cancelled(url: &str, elapsed_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            elapsed_ms,
            content_type: None,
            body: String::new(),
            failure: Some(StepFailure::Cancelled),
        }
    }

    /// First `max_chars` characters of the body.
    pub fn body_prefix(&self, max_chars: usize) -> String {
        self.body.chars().take(max_chars).collect()
    }

    /// Error text recorded on the Step; `None` on success.
    pub fn error_text(&self, max_chars: usize) -> Option<String> {
        let failure = self.failure.as_ref()?;
        let prefix = self.body_prefix(max_chars);
        Some(match failure {
            StepFailure::HttpStatus { .. } if !prefix.is_empty() => {
                format!("{}: {}", failure, prefix)
            }
            _ => failure.to_string(),
        })
    }

    pub fn to_response(&self, max_chars: usize) -> StepResponse {
        StepResponse {
            http_status: self.status,
            content_type: self.content_type.clone(),
            body_prefix: self.body_prefix(max_chars),
            url: self.url.clone(),
        }
    }
}

/// Performs step calls. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    client: reqwest::Client,
    body_prefix_len: usize,
}

impl StepExecutor {
    pub fn new(body_prefix_len: usize) -> PipelineResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| PipelineError::Http {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            body_prefix_len,
        })
    }

    pub fn body_prefix_len(&self) -> usize {
        self.body_prefix_len
    }

    /// Call `url` and wait at most `timeout` for the full response.
    pub async fn execute(&self, method: Method, url: &str, timeout: Duration) -> StepOutcome {
        let started = Instant::now();
        debug!(url = %url, method = %method, timeout_ms = timeout.as_millis() as u64, "step call");

        let call = async {
            let response = self.client.request(method, url).send().await?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, content_type, body))
        };

        // Dropping `call` on expiry cancels the in-flight request.
        let result = tokio::time::timeout(timeout, call).await;
        let elapsed_ms = elapsed_ms(started);

        let outcome = match result {
            Err(_) => StepOutcome {
                url: url.to_string(),
                status: None,
                elapsed_ms,
                content_type: None,
                body: String::new(),
                failure: Some(StepFailure::Timeout {
                    after_ms: timeout.as_millis() as u64,
                }),
            },
            Ok(Err(e)) => StepOutcome {
                url: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                elapsed_ms,
                content_type: None,
                body: String::new(),
                failure: Some(if e.is_timeout() {
                    StepFailure::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    }
                } else {
                    StepFailure::Network {
                        message: e.to_string(),
                    }
                }),
            },
            Ok(Ok((status, content_type, body))) => StepOutcome {
                url: url.to_string(),
                status: Some(status),
                elapsed_ms,
                content_type,
                body,
                failure: match status {
                    200..=299 => None,
                    _ => Some(StepFailure::HttpStatus { status }),
                },
            },
        };

        if let Some(failure) = &outcome.failure {
            warn!(url = %url, elapsed_ms, failure = %failure, "step call failed");
        } else {
            debug!(url = %url, elapsed_ms, status = ?outcome.status, "step call ok");
        }
        outcome
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    let ms = start.elapsed().as_millis();
    if ms > u128::from(u64::MAX) {
        u64::MAX
    } else {
        ms as u64
    }
}
