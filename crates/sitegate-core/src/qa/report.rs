//! QA report shape: one explicit type per probe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::gate::GateSummary;

/// Headline numbers of one audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub artifacts_ok: bool,
    /// `None` when the comparison could not be performed.
    pub html_match: Option<bool>,
    pub sitemap_match: Option<bool>,
    pub pages_checked: usize,
    pub pages_ok: usize,
    pub pages_failed: usize,
}

/// Must-have artifact keys versus what the artifact source reports present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPresence {
    pub expected: Vec<String>,
    pub present: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Set when the key listing itself failed; every key then counts as missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactPresence {
    pub fn evaluate(expected: &[String], present: &[String], source: Option<String>) -> Self {
        let missing: Vec<String> = expected
            .iter()
            .filter(|k| !present.contains(k))
            .cloned()
            .collect();
        Self {
            expected: expected.to_vec(),
            present: present.to_vec(),
            ok: missing.is_empty(),
            missing,
            source,
            error: None,
        }
    }

    pub fn unavailable(expected: &[String], error: impl Into<String>) -> Self {
        Self {
            expected: expected.to_vec(),
            present: Vec::new(),
            missing: expected.to_vec(),
            ok: false,
            source: None,
            error: Some(error.into()),
        }
    }
}

/// Result of comparing one artifact pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DiffOutcome {
    /// Both sides were read and compared.
    #[serde(rename_all = "camelCase")]
    Compared {
        matched: bool,
        diff_count: usize,
        a_len: usize,
        b_len: usize,
    },
    /// At least one side could not be read.
    Unavailable { reason: String },
    /// The audit stopped before this comparison.
    #[default]
    NotRun,
}

impl DiffOutcome {
    /// `Some(matched)` when compared, `None` otherwise.
    pub fn matched(&self) -> Option<bool> {
        match self {
            Self::Compared { matched, .. } => Some(*matched),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffsReport {
    pub html: DiffOutcome,
    pub sitemap: DiffOutcome,
}

/// Which page checks held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageChecks {
    pub status_ok: bool,
    pub title_ok: bool,
    pub canonical_ok: bool,
    pub robots_meta_ok: bool,
}

impl PageChecks {
    pub fn all_ok(&self) -> bool {
        self.status_ok && self.title_ok && self.canonical_ok && self.robots_meta_ok
    }
}

/// Raw markup signals, truncated for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    pub title: Option<String>,
    pub canonical: Option<String>,
    pub html_first200: Option<String>,
}

/// Smoke test of one live path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCheck {
    pub path: String,
    /// `None` when the fetch itself failed.
    pub status: Option<u16>,
    pub content_type: String,
    pub ok: bool,
    pub checks: PageChecks,
    pub signals: PageSignals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where the smoke-test path list came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum PathDiscovery {
    /// Parsed from the `publishedSpec` artifact.
    PublishedSpec { paths: Vec<String> },
    /// `publishedSpec` was unreadable; default paths were used.
    Fallback { paths: Vec<String>, reason: String },
}

impl PathDiscovery {
    pub fn paths(&self) -> &[String] {
        match self {
            Self::PublishedSpec { paths } | Self::Fallback { paths, .. } => paths,
        }
    }
}

/// Point-in-time audit snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReport {
    /// False when assembly failed; `error` then says why.
    pub ok: bool,
    pub project_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub config: GateConfig,
    pub summary: ReportSummary,
    pub artifacts: ArtifactPresence,
    pub diffs: DiffsReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_discovery: Option<PathDiscovery>,
    pub pages: Vec<PageCheck>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_gate: Option<GateSummary>,
}

impl QaReport {
    pub fn new(project_id: impl Into<String>, config: GateConfig) -> Self {
        Self {
            ok: true,
            project_id: project_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            config,
            summary: ReportSummary::default(),
            artifacts: ArtifactPresence::default(),
            diffs: DiffsReport::default(),
            path_discovery: None,
            pages: Vec::new(),
            notes: Vec::new(),
            error: None,
            release_gate: None,
        }
    }

    /// Recompute page counters from `pages`.
    pub fn tally_pages(&mut self) {
        self.summary.pages_checked = self.pages.len();
        self.summary.pages_ok = self.pages.iter().filter(|p| p.ok).count();
        self.summary.pages_failed = self.summary.pages_checked - self.summary.pages_ok;
    }
}
