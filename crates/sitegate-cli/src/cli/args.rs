use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sitegate_core::{GateConfig, Preset, StepName, StepOverrides};

#[derive(Parser)]
#[command(
    name = "sitegate",
    version,
    about = "Publish pipeline orchestrator and release gate for generated sites"
)]
pub struct Cli {
    /// SQLite document store
    #[arg(long, global = true, env = "SITEGATE_DB", default_value = ".sitegate/sitegate.db")]
    pub db: PathBuf,

    /// Collaborator API base URL
    #[arg(long, global = true, env = "SITEGATE_BASE_URL")]
    pub base_url: Option<String>,

    /// Live site URL for sitemap and page checks
    #[arg(long, global = true, env = "SITEGATE_SITE_URL")]
    pub site_url: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Drive the pipeline for a project (latest-run document)
    Run(RunArgs),
    /// Drive the pipeline as an indexed job
    Job(RunArgs),
    /// Show the latest run or a specific job
    Status(StatusArgs),
    /// List recent job ids, newest first
    Jobs(ProjectArg),
    /// Ask a running orchestration to stop
    Cancel(CancelArgs),
    /// Run the QA audit and release gate
    Audit(AuditArgs),
    /// Compare two files line by line
    Diff(DiffArgs),
    /// Show or clear audit history
    History(HistoryArgs),
    Version,
}

#[derive(Args, Clone)]
pub struct ProjectArg {
    pub project: String,
}

#[derive(Args, Clone)]
pub struct CancelArgs {
    pub project: String,

    /// Cancel this job instead of the project's running pipeline
    #[arg(long)]
    pub job: Option<String>,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    pub project: String,

    /// seo|full|publish
    #[arg(long, default_value = "seo")]
    pub preset: Preset,

    /// Enable a step regardless of the preset (repeatable)
    #[arg(long = "with", value_name = "STEP")]
    pub with: Vec<StepName>,

    /// Disable a step regardless of the preset (repeatable)
    #[arg(long = "without", value_name = "STEP")]
    pub without: Vec<StepName>,

    /// Per-step timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// `--without` wins when a step is named in both lists.
    pub fn overrides(&self) -> StepOverrides {
        let mut overrides = StepOverrides::default();
        for step in &self.with {
            overrides.set(*step, true);
        }
        for step in &self.without {
            overrides.set(*step, false);
        }
        overrides
    }
}

#[derive(Args, Clone)]
pub struct StatusArgs {
    pub project: String,

    /// Show this job instead of the latest run
    #[arg(long)]
    pub job: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct AuditArgs {
    pub project: String,

    /// Gate tuning file (YAML or JSON, camelCase keys)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read artifacts through the collaborator debug endpoint instead of the local store
    #[arg(long)]
    pub remote_artifacts: bool,

    #[arg(long)]
    pub html_mismatch_fail: Option<bool>,

    #[arg(long)]
    pub sitemap_mismatch_fail: Option<bool>,

    #[arg(long)]
    pub min_pages_ok_pct: Option<u32>,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long)]
    pub require_200: Option<bool>,

    #[arg(long)]
    pub require_title: Option<bool>,

    #[arg(long)]
    pub require_canonical: Option<bool>,

    #[arg(long)]
    pub require_robots_meta: Option<bool>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the shareable release gate summary instead of the table
    #[arg(long, conflicts_with = "json")]
    pub summary: bool,

    /// Exit non-zero on WARN as well as FAIL
    #[arg(long)]
    pub fail_on_warn: bool,
}

impl AuditArgs {
    /// Flags override whatever the config file (or the defaults) set.
    pub fn apply(&self, mut cfg: GateConfig) -> GateConfig {
        if let Some(v) = self.html_mismatch_fail {
            cfg.html_mismatch_fail = v;
        }
        if let Some(v) = self.sitemap_mismatch_fail {
            cfg.sitemap_mismatch_fail = v;
        }
        if let Some(v) = self.min_pages_ok_pct {
            cfg.min_pages_ok_pct = v;
        }
        if let Some(v) = self.max_pages {
            cfg.max_pages_to_check = v;
        }
        if let Some(v) = self.require_200 {
            cfg.require_200 = v;
        }
        if let Some(v) = self.require_title {
            cfg.require_title = v;
        }
        if let Some(v) = self.require_canonical {
            cfg.require_canonical = v;
        }
        if let Some(v) = self.require_robots_meta {
            cfg.require_robots_meta = v;
        }
        if let Some(v) = self.concurrency {
            cfg.page_concurrency = v;
        }
        cfg
    }
}

#[derive(Args, Clone)]
pub struct DiffArgs {
    pub a: PathBuf,
    pub b: PathBuf,

    /// Lines of context on each side of the focused diff
    #[arg(long, default_value_t = sitegate_core::diff::DEFAULT_CONTEXT_RADIUS)]
    pub radius: usize,

    /// Focus the n-th diff (1-based)
    #[arg(long, default_value_t = 1)]
    pub at: usize,

    /// Label used in the diff block header
    #[arg(long, default_value = "html")]
    pub kind: String,

    /// Project id used in the diff block header
    #[arg(long, default_value = "local")]
    pub project: String,

    /// Print a copyable diff block instead of the side-by-side windows
    #[arg(long)]
    pub block: bool,
}

#[derive(Args, Clone)]
pub struct HistoryArgs {
    pub project: String,

    #[arg(long)]
    pub clear: bool,

    #[arg(long)]
    pub json: bool,
}
