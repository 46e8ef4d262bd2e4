//! Run / Step documents and preset resolution.
//!
//! A [`Run`] is persisted whole on every transition, so everything here is
//! plain serde data. Field names follow the document shape external viewers
//! read: `{ projectId, status, preset, startedAt, endedAt?, steps: [...] }`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Overall status of a Run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Error,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one Step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Success,
    Error,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// The fixed step catalog, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepName {
    #[serde(rename = "seed")]
    Seed,
    #[serde(rename = "seo")]
    Seo,
    #[serde(rename = "content-finish")]
    ContentFinish,
    #[serde(rename = "sitemap")]
    Sitemap,
    #[serde(rename = "publish")]
    Publish,
}

impl StepName {
    /// Catalog order. Later steps depend on the durable side effects of earlier ones.
    pub const CATALOG: [StepName; 5] = [
        StepName::Seed,
        StepName::Seo,
        StepName::ContentFinish,
        StepName::Sitemap,
        StepName::Publish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Seo => "seo",
            Self::ContentFinish => "content-finish",
            Self::Sitemap => "sitemap",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepName::CATALOG
            .into_iter()
            .find(|step| step.as_str() == s.trim())
            .ok_or_else(|| PipelineError::invalid_input(format!("unknown step: {s}")))
    }
}

/// Named default selection of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Seo,
    Full,
    Publish,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seo => "seo",
            Self::Full => "full",
            Self::Publish => "publish",
        }
    }

    /// Default boolean vector over the catalog.
    pub fn defaults(self) -> StepFlags {
        match self {
            Self::Seo => StepFlags {
                seed: true,
                seo: true,
                content_finish: false,
                sitemap: true,
                publish: false,
            },
            Self::Full => StepFlags {
                seed: true,
                seo: true,
                content_finish: true,
                sitemap: true,
                publish: true,
            },
            Self::Publish => StepFlags {
                seed: false,
                seo: false,
                content_finish: false,
                sitemap: true,
                publish: true,
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "seo" => Ok(Self::Seo),
            "full" => Ok(Self::Full),
            "publish" => Ok(Self::Publish),
            other => Err(PipelineError::invalid_input(format!(
                "unknown preset: {other} (expected seo|full|publish)"
            ))),
        }
    }
}

/// Resolved option set: which catalog steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFlags {
    pub seed: bool,
    pub seo: bool,
    pub content_finish: bool,
    pub sitemap: bool,
    pub publish: bool,
}

impl StepFlags {
    pub fn resolve(preset: Preset, overrides: &StepOverrides) -> Self {
        let base = preset.defaults();
        Self {
            seed: overrides.seed.unwrap_or(base.seed),
            seo: overrides.seo.unwrap_or(base.seo),
            content_finish: overrides.content_finish.unwrap_or(base.content_finish),
            sitemap: overrides.sitemap.unwrap_or(base.sitemap),
            publish: overrides.publish.unwrap_or(base.publish),
        }
    }

    pub fn includes(&self, step: StepName) -> bool {
        match step {
            StepName::Seed => self.seed,
            StepName::Seo => self.seo,
            StepName::ContentFinish => self.content_finish,
            StepName::Sitemap => self.sitemap,
            StepName::Publish => self.publish,
        }
    }

    /// Selected steps in catalog order.
    pub fn selected(&self) -> Vec<StepName> {
        StepName::CATALOG
            .into_iter()
            .filter(|s| self.includes(*s))
            .collect()
    }
}

/// Explicit per-step overrides; `None` keeps the preset default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepOverrides {
    pub seed: Option<bool>,
    pub seo: Option<bool>,
    pub content_finish: Option<bool>,
    pub sitemap: Option<bool>,
    pub publish: Option<bool>,
}

impl StepOverrides {
    pub fn set(&mut self, step: StepName, enabled: bool) {
        let slot = match step {
            StepName::Seed => &mut self.seed,
            StepName::Seo => &mut self.seo,
            StepName::ContentFinish => &mut self.content_finish,
            StepName::Sitemap => &mut self.sitemap,
            StepName::Publish => &mut self.publish,
        };
        *slot = Some(enabled);
    }

    pub fn with(mut self, step: StepName, enabled: bool) -> Self {
        self.set(step, enabled);
        self
    }
}

/// Diagnostic metadata of a step's collaborator response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "bodyFirst200")]
    pub body_prefix: String,
    pub url: String,
}

/// One named unit of work inside a Run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: StepName,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<StepResponse>,
}

impl Step {
    fn begin(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            ms: None,
            error: None,
            response: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != StepStatus::Running
    }
}

/// How a Run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One mutable "latest run" document per project.
    Run,
    /// One document per job id, plus a per-project job index.
    Job,
}

/// One execution of a preset pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: String,
    pub project_id: String,
    pub mode: RunMode,
    pub preset: Preset,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub config: StepFlags,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Run {
    pub fn new(
        run_id: impl Into<String>,
        project_id: impl Into<String>,
        mode: RunMode,
        preset: Preset,
        config: StepFlags,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            project_id: project_id.into(),
            mode,
            preset,
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            config,
            steps: Vec::new(),
        }
    }

    /// Append a new running step. Refused once the Run is terminal or
    /// while another step is still running.
    pub fn begin_step(&mut self, name: StepName) -> Option<usize> {
        if self.status.is_terminal() || self.current_step().is_some() {
            return None;
        }
        self.steps.push(Step::begin(name));
        Some(self.steps.len() - 1)
    }

    /// The step currently running, if any.
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| !s.is_finished())
    }

    /// Set a step's terminal status. A step already terminal is left as is.
    pub fn finish_step(
        &mut self,
        index: usize,
        status: StepStatus,
        elapsed_ms: u64,
        error: Option<String>,
        response: Option<StepResponse>,
    ) -> bool {
        let Some(step) = self.steps.get_mut(index) else {
            return false;
        };
        if step.is_finished() || status == StepStatus::Running {
            return false;
        }
        step.status = status;
        step.ended_at = Some(Utc::now());
        step.ms = Some(elapsed_ms);
        step.error = error;
        step.response = response;
        true
    }

    /// Move the Run to a terminal status. Terminal runs never change again.
    pub fn finish(&mut self, status: RunStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.ended_at = Some(Utc::now());
        true
    }

    /// Error text of the first failed step.
    pub fn failure(&self) -> Option<(&Step, &str)> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Error)
            .map(|s| (s, s.error.as_deref().unwrap_or("step failed")))
    }
}

/// Validate a project identifier before any Run is created.
pub fn validate_project_id(project_id: &str) -> Result<(), PipelineError> {
    if project_id.is_empty() {
        return Err(PipelineError::invalid_input("missing projectId"));
    }
    let valid = project_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(PipelineError::invalid_input(format!(
            "invalid projectId: {project_id:?}"
        )));
    }
    Ok(())
}
