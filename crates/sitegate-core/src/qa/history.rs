//! Per-project audit history, newest first and capped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::{QaReport, ReportSummary};
use crate::error::PipelineResult;
use crate::gate::{GateSummary, Verdict};
use crate::store::runs::push_front_capped;
use crate::store::{get_json, keys, set_json, KvStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub at: DateTime<Utc>,
    pub verdict: Verdict,
    pub score: u32,
    pub summary: ReportSummary,
    pub report: QaReport,
}

impl HistoryItem {
    pub fn new(report: &QaReport, gate: &GateSummary) -> Self {
        Self {
            id: format!("qa_{}", Uuid::new_v4().simple()),
            at: report.ended_at.unwrap_or_else(Utc::now),
            verdict: gate.verdict,
            score: gate.score,
            summary: report.summary.clone(),
            report: report.clone(),
        }
    }
}

/// Explicit store for audit history, injected into the audit runner.
pub trait AuditHistory: Send + Sync {
    fn get(&self, project_id: &str) -> PipelineResult<Vec<HistoryItem>>;

    /// Prepend `item`; returns the capped list now stored.
    fn append(&self, project_id: &str, item: HistoryItem) -> PipelineResult<Vec<HistoryItem>>;

    fn clear(&self, project_id: &str) -> PipelineResult<()>;
}

pub struct KvHistory {
    kv: Arc<dyn KvStore>,
    cap: usize,
}

impl KvHistory {
    pub fn new(kv: Arc<dyn KvStore>, cap: usize) -> Self {
        Self { kv, cap }
    }
}

impl AuditHistory for KvHistory {
    fn get(&self, project_id: &str) -> PipelineResult<Vec<HistoryItem>> {
        Ok(get_json(self.kv.as_ref(), &keys::history_key(project_id))?.unwrap_or_default())
    }

    fn append(&self, project_id: &str, item: HistoryItem) -> PipelineResult<Vec<HistoryItem>> {
        let prev = self.get(project_id)?;
        let next = push_front_capped(prev, item, self.cap);
        set_json(self.kv.as_ref(), &keys::history_key(project_id), &next)?;
        Ok(next)
    }

    fn clear(&self, project_id: &str) -> PipelineResult<()> {
        self.kv.delete(&keys::history_key(project_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::gate;
    use crate::store::MemoryKv;

    fn item(project: &str) -> HistoryItem {
        let report = QaReport::new(project, GateConfig::default());
        let summary = gate::evaluate(&report, &GateConfig::default());
        HistoryItem::new(&report, &summary)
    }

    #[test]
    fn test_history_is_capped_newest_first() {
        let history = KvHistory::new(Arc::new(MemoryKv::new()), 10);
        let mut ids = Vec::new();
        for _ in 0..11 {
            let it = item("acme");
            ids.push(it.id.clone());
            history.append("acme", it).unwrap();
        }
        let stored = history.get("acme").unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0].id, ids[10]);
        assert_eq!(stored[9].id, ids[1]);
    }

    #[test]
    fn test_clear_is_per_project() {
        let history = KvHistory::new(Arc::new(MemoryKv::new()), 10);
        history.append("a", item("a")).unwrap();
        history.append("b", item("b")).unwrap();
        history.clear("a").unwrap();
        assert!(history.get("a").unwrap().is_empty());
        assert_eq!(history.get("b").unwrap().len(), 1);
    }
}
