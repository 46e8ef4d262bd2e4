//! QA audit runner: gathers release signals into one scored report.
//!
//! Probes run in order (artifact presence, HTML diff, sitemap diff, path
//! discovery, page smoke tests). Page fetches run concurrently but every
//! candidate path is always attempted. [`QaAuditRunner::run`] never fails:
//! an assembly error is recorded on the report.

pub mod artifacts;
pub mod history;
pub mod pages;
pub mod report;
pub mod site;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::GateConfig;
use crate::diff::compute_diff;
use crate::gate;
use crate::model::validate_project_id;
use crate::store::keys;

pub use artifacts::{must_have_keys, ArtifactSource, HttpArtifacts, KvArtifacts};
pub use history::{AuditHistory, HistoryItem, KvHistory};
pub use report::{DiffOutcome, PageCheck, PathDiscovery, QaReport, ReportSummary};
pub use site::{Fetched, SiteClient};

pub struct QaAuditRunner {
    artifacts: Arc<dyn ArtifactSource>,
    site: SiteClient,
    history: Arc<dyn AuditHistory>,
    config: GateConfig,
}

impl QaAuditRunner {
    pub fn new(
        artifacts: Arc<dyn ArtifactSource>,
        site: SiteClient,
        history: Arc<dyn AuditHistory>,
        config: GateConfig,
    ) -> Self {
        Self {
            artifacts,
            site,
            history,
            config,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<dyn AuditHistory> {
        &self.history
    }

    /// Audit `project_id`, score it and append it to the project's history.
    pub async fn run(&self, project_id: &str) -> QaReport {
        let mut report = QaReport::new(project_id, self.config.clone());

        if let Err(e) = self.assemble(&mut report).await {
            report.ok = false;
            report.error = Some(format!("{:#}", e));
            report.ended_at = Some(Utc::now());
            warn!(project_id = %project_id, error = %format!("{:#}", e), "audit failed");
            return report;
        }

        report.ended_at = Some(Utc::now());
        let summary = gate::evaluate(&report, &self.config);
        info!(
            project_id = %project_id,
            verdict = %summary.verdict,
            score = summary.score,
            "audit scored"
        );
        report.release_gate = Some(summary.clone());

        let item = HistoryItem::new(&report, &summary);
        if let Err(e) = self.history.append(project_id, item) {
            warn!(project_id = %project_id, error = %e, "history append failed");
            report.notes.push(format!("history append failed: {}", e));
        }
        report
    }

    async fn assemble(&self, report: &mut QaReport) -> anyhow::Result<()> {
        let project_id = report.project_id.clone();
        validate_project_id(&project_id)?;
        self.config.validate().context("invalid gate configuration")?;

        let expected = must_have_keys(&project_id);
        report.artifacts = match self.artifacts.present_keys(&project_id).await {
            Ok(present) => report::ArtifactPresence::evaluate(
                &expected,
                &present,
                Some(self.artifacts.name().to_string()),
            ),
            Err(e) => report::ArtifactPresence::unavailable(&expected, format!("{:#}", e)),
        };
        report.summary.artifacts_ok = report.artifacts.ok;

        report.diffs.html = self.compare_html(&project_id).await;
        report.summary.html_match = report.diffs.html.matched();

        report.diffs.sitemap = self.compare_sitemap(&project_id).await;
        report.summary.sitemap_match = report.diffs.sitemap.matched();

        let discovery = self.discover(&project_id).await;
        if let PathDiscovery::Fallback { reason, .. } = &discovery {
            report
                .notes
                .push(format!("publishedSpec unreadable ({}); using fallback paths", reason));
        }
        let paths = discovery.paths().to_vec();
        report.path_discovery = Some(discovery);

        report.pages = self.check_pages(paths).await?;
        report.tally_pages();
        Ok(())
    }

    /// Text artifact under `key`, or why it could not be used.
    async fn read_text(&self, project_id: &str, key: &str) -> Result<String, String> {
        match self.artifacts.read(project_id, key).await {
            Ok(Some(Value::String(s))) => Ok(s),
            Ok(Some(_)) => Err(format!("{} is not a string", key)),
            Ok(None) => Err(format!("{} is missing", key)),
            Err(e) => Err(format!("{:#}", e)),
        }
    }

    async fn compare_html(&self, project_id: &str) -> DiffOutcome {
        let generated = self
            .read_text(project_id, &keys::generated_key(project_id))
            .await;
        let published = self
            .read_text(project_id, &keys::published_key(project_id))
            .await;
        match (generated, published) {
            (Ok(a), Ok(b)) => compared(&a, &b),
            (Err(e), _) | (_, Err(e)) => DiffOutcome::Unavailable { reason: e },
        }
    }

    async fn compare_sitemap(&self, project_id: &str) -> DiffOutcome {
        let live = match self.site.fetch("/sitemap.xml").await {
            Ok(f) if f.is_success() => f.body,
            Ok(f) => {
                return DiffOutcome::Unavailable {
                    reason: format!(
                        "live /sitemap.xml failed (HTTP {}). First200: {}",
                        f.status,
                        pages::shorten(&f.body, 200)
                    ),
                }
            }
            Err(e) => return DiffOutcome::Unavailable { reason: e },
        };
        match self
            .read_text(project_id, &keys::sitemap_xml_key(project_id))
            .await
        {
            Ok(stored) => compared(&live, &stored),
            Err(e) => DiffOutcome::Unavailable { reason: e },
        }
    }

    async fn discover(&self, project_id: &str) -> PathDiscovery {
        let fallback = |reason: String| PathDiscovery::Fallback {
            paths: pages::default_paths(),
            reason,
        };
        match self
            .artifacts
            .read(project_id, &keys::published_spec_key(project_id))
            .await
        {
            Ok(Some(spec)) => PathDiscovery::PublishedSpec {
                paths: pages::discover_paths(&spec, self.config.max_pages_to_check),
            },
            Ok(None) => fallback("missing".to_string()),
            Err(e) => fallback(format!("{:#}", e)),
        }
    }

    /// Fetch every path with bounded concurrency; results keep `paths` order.
    async fn check_pages(&self, paths: Vec<String>) -> anyhow::Result<Vec<PageCheck>> {
        let sem = Arc::new(Semaphore::new(self.config.page_concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, path) in paths.iter().cloned().enumerate() {
            let sem = sem.clone();
            let site = self.site.clone();
            let config = self.config.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let fetched = site.fetch(&path).await;
                (idx, pages::evaluate_page(&path, fetched, &config))
            });
        }

        let mut slots: Vec<Option<PageCheck>> = vec![None; paths.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, check) = joined.context("page check task failed")?;
            slots[idx] = Some(check);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

fn compared(a: &str, b: &str) -> DiffOutcome {
    let diff = compute_diff(a, b);
    DiffOutcome::Compared {
        matched: diff.is_match(),
        diff_count: diff.diffs.len(),
        a_len: diff.a.chars().count(),
        b_len: diff.b.chars().count(),
    }
}
