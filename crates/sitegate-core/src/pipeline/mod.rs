//! Publish pipeline orchestrator.
//!
//! Drives the selected catalog steps strictly in order, persisting the whole
//! Run document after every transition so observers can follow progress
//! mid-flight. The first failing step ends the Run as `error`; there is no
//! retry.

pub mod cancel;
pub mod catalog;
pub mod locks;

use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::executor::{elapsed_ms, StepExecutor, StepFailure, StepOutcome};
use crate::model::{
    validate_project_id, Preset, Run, RunMode, RunStatus, StepFlags, StepName, StepOverrides,
    StepStatus,
};
use crate::store::RunStore;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use locks::ProjectLocks;

/// What to run for which project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub project_id: String,
    pub preset: Preset,
    pub overrides: StepOverrides,
}

impl RunRequest {
    pub fn new(project_id: impl Into<String>, preset: Preset) -> Self {
        Self {
            project_id: project_id.into(),
            preset,
            overrides: StepOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: StepOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Raw collaborator response of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPayload {
    pub step: StepName,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Final Run plus each executed step's payload.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run: Run,
    pub payloads: Vec<StepPayload>,
}

impl RunOutput {
    pub fn is_success(&self) -> bool {
        self.run.status == RunStatus::Success
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: RunStore,
    executor: StepExecutor,
    config: PipelineConfig,
    locks: ProjectLocks,
}

impl Orchestrator {
    pub fn new(store: RunStore, config: PipelineConfig) -> PipelineResult<Self> {
        let executor = StepExecutor::new(config.body_prefix_len)?;
        Ok(Self {
            store,
            executor,
            config,
            locks: ProjectLocks::default(),
        })
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run mode: progress is written to the project's "latest run" document.
    pub async fn run_preset(
        &self,
        request: &RunRequest,
        cancel: Option<CancelSignal>,
    ) -> PipelineResult<RunOutput> {
        self.start(request, RunMode::Run, cancel).await
    }

    /// Job mode: one document per job plus the project's job index.
    pub async fn run_job(
        &self,
        request: &RunRequest,
        cancel: Option<CancelSignal>,
    ) -> PipelineResult<RunOutput> {
        self.start(request, RunMode::Job, cancel).await
    }

    async fn start(
        &self,
        request: &RunRequest,
        mode: RunMode,
        cancel: Option<CancelSignal>,
    ) -> PipelineResult<RunOutput> {
        validate_project_id(&request.project_id)?;
        let _guard = self.locks.try_acquire(&request.project_id)?;

        let flags = StepFlags::resolve(request.preset, &request.overrides);
        let prefix = match mode {
            RunMode::Run => "run",
            RunMode::Job => "job",
        };
        let run_id = format!("{}_{}", prefix, Uuid::new_v4().simple());
        let mut run = Run::new(run_id, &request.project_id, mode, request.preset, flags);

        // Visible to observers before the first step starts.
        self.store.save(&run)?;
        if mode == RunMode::Job {
            self.store
                .record_job_started(&run.project_id, &run.run_id, self.config.job_list_cap)?;
        }

        let selected = flags.selected();
        info!(
            project_id = %run.project_id,
            run_id = %run.run_id,
            preset = %run.preset,
            steps = ?selected.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "pipeline started"
        );

        let payloads = self.drive(&mut run, &selected, cancel).await?;
        self.store.clear_cancel(&run)?;

        info!(
            project_id = %run.project_id,
            run_id = %run.run_id,
            status = %run.status,
            steps = run.steps.len(),
            "pipeline finished"
        );
        Ok(RunOutput { run, payloads })
    }

    async fn drive(
        &self,
        run: &mut Run,
        selected: &[StepName],
        mut cancel: Option<CancelSignal>,
    ) -> PipelineResult<Vec<StepPayload>> {
        let mut payloads = Vec::with_capacity(selected.len());

        for &step in selected {
            if self.cancel_requested(run, cancel.as_ref())? {
                self.finish_cancelled(run, 0)?;
                return Ok(payloads);
            }

            let Some(index) = run.begin_step(step) else {
                break;
            };
            self.store.save(run)?;

            // A request recorded while the step was being opened is honoured
            // before any call goes out.
            if self.store.cancel_requested(run)? {
                self.finish_cancelled(run, 0)?;
                return Ok(payloads);
            }

            let url = catalog::step_url(step, &run.project_id, &self.config);
            let started = Instant::now();
            let outcome = tokio::select! {
                outcome = self.executor.execute(
                    catalog::step_method(step),
                    &url,
                    self.config.step_timeout(),
                ) => outcome,
                _ = wait_cancelled(cancel.as_mut()) => {
                    StepOutcome::cancelled(&url, elapsed_ms(started))
                }
            };

            if outcome.failure == Some(StepFailure::Cancelled) {
                warn!(project_id = %run.project_id, step = %step, "step aborted by cancellation");
                self.finish_cancelled(run, outcome.elapsed_ms)?;
                return Ok(payloads);
            }

            let prefix_len = self.executor.body_prefix_len();
            let status = if outcome.is_success() {
                StepStatus::Success
            } else {
                StepStatus::Error
            };
            run.finish_step(
                index,
                status,
                outcome.elapsed_ms,
                outcome.error_text(prefix_len),
                Some(outcome.to_response(prefix_len)),
            );
            payloads.push(StepPayload {
                step,
                http_status: outcome.status,
                content_type: outcome.content_type.clone(),
                body: outcome.body,
            });

            if status == StepStatus::Error {
                warn!(
                    project_id = %run.project_id,
                    step = %step,
                    elapsed_ms = outcome.elapsed_ms,
                    status = ?outcome.status,
                    "step failed, stopping run"
                );
                self.store.save(run)?;
                run.finish(RunStatus::Error);
                self.store.save(run)?;
                return Ok(payloads);
            }

            info!(
                project_id = %run.project_id,
                step = %step,
                elapsed_ms = outcome.elapsed_ms,
                "step succeeded"
            );
            self.store.save(run)?;
        }

        // Every selected step succeeded: a cancel arriving now has nothing left to stop.
        run.finish(RunStatus::Success);
        self.store.save(run)?;
        Ok(payloads)
    }

    fn cancel_requested(&self, run: &Run, signal: Option<&CancelSignal>) -> PipelineResult<bool> {
        if signal.is_some_and(|s| s.is_cancelled()) {
            return Ok(true);
        }
        self.store.cancel_requested(run)
    }

    fn finish_cancelled(&self, run: &mut Run, elapsed_ms: u64) -> PipelineResult<()> {
        mark_cancelled(run, elapsed_ms);
        info!(project_id = %run.project_id, run_id = %run.run_id, "run cancelled");
        self.store.save(run)
    }

    /// Ask the project's running Run (or, failing that, its running latest
    /// job) to stop. The request is stored beside the Run document; the
    /// orchestrator driving it stops before its next step and writes the
    /// `cancelled` status itself.
    pub fn request_cancel(&self, project_id: &str) -> PipelineResult<Run> {
        validate_project_id(project_id)?;
        let candidates = [
            self.store.latest_run(project_id)?,
            self.store.latest_job(project_id)?,
        ];
        for run in candidates.into_iter().flatten() {
            if run.status == RunStatus::Running {
                self.store.request_cancel(&run)?;
                info!(project_id = %project_id, run_id = %run.run_id, "cancel requested");
                return Ok(run);
            }
        }
        Err(PipelineError::NotFound {
            what: format!("running pipeline for project {}", project_id),
        })
    }

    /// Ask one running job to stop.
    pub fn cancel_job(&self, job_id: &str) -> PipelineResult<Run> {
        match self.store.job(job_id)? {
            Some(run) if run.status == RunStatus::Running => {
                self.store.request_cancel(&run)?;
                info!(job_id = %job_id, "cancel requested");
                Ok(run)
            }
            _ => Err(PipelineError::NotFound {
                what: format!("running job {}", job_id),
            }),
        }
    }

    pub fn latest_run(&self, project_id: &str) -> PipelineResult<Option<Run>> {
        validate_project_id(project_id)?;
        self.store.latest_run(project_id)
    }

    pub fn job(&self, job_id: &str) -> PipelineResult<Option<Run>> {
        self.store.job(job_id)
    }

    pub fn latest_job(&self, project_id: &str) -> PipelineResult<Option<Run>> {
        validate_project_id(project_id)?;
        self.store.latest_job(project_id)
    }

    pub fn recent_jobs(&self, project_id: &str) -> PipelineResult<Vec<String>> {
        validate_project_id(project_id)?;
        self.store.recent_job_ids(project_id)
    }
}

/// Close the running step (if any) as "cancelled" and end the Run.
fn mark_cancelled(run: &mut Run, elapsed_ms: u64) {
    if let Some(index) = run.steps.iter().position(|s| !s.is_finished()) {
        run.finish_step(
            index,
            StepStatus::Error,
            elapsed_ms,
            Some(StepFailure::Cancelled.to_string()),
            None,
        );
    }
    run.finish(RunStatus::Cancelled);
}

async fn wait_cancelled(signal: Option<&mut CancelSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}
