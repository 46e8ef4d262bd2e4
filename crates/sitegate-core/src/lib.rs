//! Publish pipeline orchestrator and release gate audit engine.
//!
//! This crate provides:
//!
//! - A run/job state machine that drives a fixed catalog of collaborator
//!   steps (seed, seo, content-finish, sitemap, publish) strictly in order
//! - Whole-document persistence of every Run transition in a key-value store
//! - A line diff engine with a navigable context window
//! - A weighted release gate producing a PASS/WARN/FAIL verdict
//! - A QA audit runner with capped per-project history
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sitegate_core::{Orchestrator, PipelineConfig, Preset, RunRequest, RunStore, SqliteKv};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let kv = Arc::new(SqliteKv::open(std::path::Path::new(".sitegate/sitegate.db"))?);
//! let orchestrator = Orchestrator::new(RunStore::new(kv), PipelineConfig::from_env())?;
//!
//! let output = orchestrator
//!     .run_preset(&RunRequest::new("acme", Preset::Seo), None)
//!     .await?;
//! println!("{} -> {}", output.run.run_id, output.run.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SITEGATE_BASE_URL` | Collaborator base URL (default: `http://localhost:3000`) |
//! | `SITEGATE_SITE_URL` | Live site URL for sitemap and page checks (default: base URL) |
//! | `SITEGATE_STEP_TIMEOUT` | Step timeout in seconds (default: 20) |
//! | `SITEGATE_TARGET_COUNT` | `targetCount` for the seo step (default: 5000) |
//! | `SITEGATE_CHUNK_SIZE` | `chunkSize` for the seo step (default: 500) |

pub mod config;
pub mod diff;
pub mod error;
pub mod executor;
pub mod gate;
pub mod model;
pub mod pipeline;
pub mod qa;
pub mod report;
pub mod store;

// Re-export main types
pub use config::{load_gate_config, GateConfig, PipelineConfig};
pub use diff::{build_context, compute_diff, normalize, ContextWindow, DiffSession};
pub use error::{PipelineError, PipelineResult};
pub use executor::{StepExecutor, StepFailure, StepOutcome};
pub use gate::{compute_summary, GateResult, GateStatus, GateSummary, Verdict};
pub use model::{Preset, Run, RunMode, RunStatus, Step, StepFlags, StepName, StepOverrides};
pub use pipeline::{
    cancel_pair, CancelHandle, CancelSignal, Orchestrator, RunOutput, RunRequest, StepPayload,
};
pub use qa::{
    AuditHistory, HistoryItem, HttpArtifacts, KvArtifacts, KvHistory, QaAuditRunner, QaReport,
    SiteClient,
};
pub use store::{KvStore, MemoryKv, RunStore, SqliteKv};
