//! Where the audit reads stored artifacts from.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::site::audit_client;
use crate::error::PipelineResult;
use crate::store::{keys, KvStore};

/// Artifact keys that must exist before a release.
pub fn must_have_keys(project_id: &str) -> Vec<String> {
    vec![
        keys::generated_key(project_id),
        keys::published_key(project_id),
        keys::sitemap_xml_key(project_id),
        keys::published_spec_key(project_id),
        keys::seo_plan_key(project_id),
    ]
}

#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Short name recorded on the report.
    fn name(&self) -> &'static str;

    /// Keys known to exist for the project.
    async fn present_keys(&self, project_id: &str) -> anyhow::Result<Vec<String>>;

    /// Full value stored under `key`, `None` when absent.
    async fn read(&self, project_id: &str, key: &str) -> anyhow::Result<Option<Value>>;
}

/// Reads artifacts straight from the key-value store.
pub struct KvArtifacts {
    kv: Arc<dyn KvStore>,
}

impl KvArtifacts {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl ArtifactSource for KvArtifacts {
    fn name(&self) -> &'static str {
        "kv"
    }

    async fn present_keys(&self, project_id: &str) -> anyhow::Result<Vec<String>> {
        let mut present = Vec::new();
        for key in must_have_keys(project_id) {
            if self.kv.get(&key)?.is_some() {
                present.push(key);
            }
        }
        Ok(present)
    }

    async fn read(&self, _project_id: &str, key: &str) -> anyhow::Result<Option<Value>> {
        // Values that are not JSON documents are raw text artifacts.
        Ok(self.kv.get(key)?.map(|raw| {
            serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecListing {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    present_keys: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FullRead {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Reads artifacts through the collaborator's `debug/spec` endpoint.
pub struct HttpArtifacts {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArtifacts {
    pub fn new(base_url: impl Into<String>) -> PipelineResult<Self> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: audit_client(Duration::from_secs(20))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, project_id: &str) -> String {
        format!("{}/api/projects/{}/debug/spec", self.base_url, project_id)
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifacts {
    fn name(&self) -> &'static str {
        "debug/spec"
    }

    async fn present_keys(&self, project_id: &str) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint(project_id))
            .send()
            .await
            .context("artifact listing request failed")?;
        let status = response.status();
        let listing: Option<SpecListing> = response.json().await.ok();
        match listing {
            Some(l) if status.is_success() && l.ok => Ok(l.present_keys),
            Some(l) => Err(anyhow!(l.error.unwrap_or_else(|| format!("HTTP {}", status.as_u16())))),
            None => Err(anyhow!("HTTP {}: unreadable artifact listing", status.as_u16())),
        }
    }

    async fn read(&self, project_id: &str, key: &str) -> anyhow::Result<Option<Value>> {
        let response = self
            .client
            .get(self.endpoint(project_id))
            .query(&[("full", "1"), ("key", key)])
            .send()
            .await
            .with_context(|| format!("read of {} failed", key))?;
        let status = response.status();
        let full: Option<FullRead> = response.json().await.ok();
        match full {
            Some(f) if status.is_success() && f.ok => Ok((!f.value.is_null()).then_some(f.value)),
            Some(f) => Err(anyhow!(f.error.unwrap_or_else(|| format!("HTTP {}", status.as_u16())))),
            None => Err(anyhow!("HTTP {}: unreadable value for {}", status.as_u16(), key)),
        }
    }
}
