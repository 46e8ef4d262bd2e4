//! Orchestrator and release-gate configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Connection and sizing settings for the publish pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the collaborator API that serves the step endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the live site (sitemap and page smoke tests).
    /// Falls back to `base_url` when unset.
    #[serde(default)]
    pub site_url: Option<String>,

    /// Per-step timeout in seconds.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Characters of response body kept on a Step record.
    #[serde(default = "default_body_prefix")]
    pub body_prefix_len: usize,

    /// `targetCount` forwarded to the seo step.
    #[serde(default = "default_target_count")]
    pub target_count: u32,

    /// `chunkSize` forwarded to the seo step.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Maximum number of job ids kept in a project's recent-job list.
    #[serde(default = "default_job_list_cap")]
    pub job_list_cap: usize,

    /// Maximum number of audits kept in a project's history.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_step_timeout() -> u64 {
    20
}

fn default_body_prefix() -> usize {
    200
}

fn default_target_count() -> u32 {
    5000
}

fn default_chunk_size() -> u32 {
    500
}

fn default_job_list_cap() -> usize {
    50
}

fn default_history_cap() -> usize {
    10
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site_url: None,
            step_timeout_secs: default_step_timeout(),
            body_prefix_len: default_body_prefix(),
            target_count: default_target_count(),
            chunk_size: default_chunk_size(),
            job_list_cap: default_job_list_cap(),
            history_cap: default_history_cap(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SITEGATE_BASE_URL` | Collaborator base URL |
    /// | `SITEGATE_SITE_URL` | Live site URL |
    /// | `SITEGATE_STEP_TIMEOUT` | Step timeout in seconds |
    /// | `SITEGATE_TARGET_COUNT` | seo step `targetCount` |
    /// | `SITEGATE_CHUNK_SIZE` | seo step `chunkSize` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("SITEGATE_BASE_URL").unwrap_or(defaults.base_url),
            site_url: std::env::var("SITEGATE_SITE_URL").ok(),
            step_timeout_secs: env_parse("SITEGATE_STEP_TIMEOUT")
                .unwrap_or(defaults.step_timeout_secs),
            target_count: env_parse("SITEGATE_TARGET_COUNT").unwrap_or(defaults.target_count),
            chunk_size: env_parse("SITEGATE_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            ..defaults
        }
    }

    /// Set the collaborator base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the live site URL.
    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    /// Set the per-step timeout.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    pub fn with_job_list_cap(mut self, cap: usize) -> Self {
        self.job_list_cap = cap;
        self
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Collaborator base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Live site URL without a trailing slash.
    pub fn site(&self) -> &str {
        self.site_url
            .as_deref()
            .unwrap_or(&self.base_url)
            .trim_end_matches('/')
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Release-gate tuning: which page checks run and how mismatches are scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    /// Generated-vs-published mismatch is `fail` (else `warn`).
    pub html_mismatch_fail: bool,
    /// Live-vs-stored sitemap mismatch is `fail` (else `warn`).
    pub sitemap_mismatch_fail: bool,
    /// Minimum percentage of smoke-tested pages that must pass.
    pub min_pages_ok_pct: u32,
    /// Upper bound on discovered paths to smoke test.
    pub max_pages_to_check: usize,
    #[serde(rename = "require200")]
    pub require_200: bool,
    pub require_title: bool,
    pub require_canonical: bool,
    pub require_robots_meta: bool,
    /// Page fetches in flight at once.
    pub page_concurrency: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            html_mismatch_fail: true,
            sitemap_mismatch_fail: true,
            min_pages_ok_pct: 100,
            max_pages_to_check: 12,
            require_200: true,
            require_title: true,
            require_canonical: false,
            require_robots_meta: false,
            page_concurrency: 4,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.min_pages_ok_pct > 100 {
            return Err(PipelineError::invalid_input(format!(
                "minPagesOkPct must be within 0..=100, got {}",
                self.min_pages_ok_pct
            )));
        }
        if self.max_pages_to_check == 0 {
            return Err(PipelineError::invalid_input(
                "maxPagesToCheck must be at least 1",
            ));
        }
        if self.page_concurrency == 0 {
            return Err(PipelineError::invalid_input(
                "pageConcurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Load gate tuning from a YAML (or JSON) file. Missing fields take defaults.
pub fn load_gate_config(path: &Path) -> PipelineResult<GateConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
        message: format!("failed to read {}: {}", path.display(), e),
    })?;
    let cfg: GateConfig = serde_yaml::from_str(&raw).map_err(|e| PipelineError::Config {
        message: format!("failed to parse {}: {}", path.display(), e),
    })?;
    cfg.validate()?;
    Ok(cfg)
}
