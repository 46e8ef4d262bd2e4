use std::sync::Arc;

use tracing::debug;

use super::{get_json, keys, set_json, KvStore};
use crate::error::PipelineResult;
use crate::model::{Run, RunMode};

/// Persistence for Run documents and the per-project job index.
#[derive(Clone)]
pub struct RunStore {
    kv: Arc<dyn KvStore>,
}

impl RunStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Replace the whole Run document under the key its mode dictates.
    pub fn save(&self, run: &Run) -> PipelineResult<()> {
        let key = match run.mode {
            RunMode::Run => keys::run_key(&run.project_id),
            RunMode::Job => keys::job_key(&run.run_id),
        };
        debug!(key = %key, status = %run.status, steps = run.steps.len(), "persist run");
        set_json(self.kv.as_ref(), &key, run)
    }

    fn cancel_key(run: &Run) -> String {
        match run.mode {
            RunMode::Run => keys::run_cancel_key(&run.project_id),
            RunMode::Job => keys::job_cancel_key(&run.run_id),
        }
    }

    /// Record a cancel request for `run`. The Run document itself is left
    /// to the orchestrator driving it.
    pub fn request_cancel(&self, run: &Run) -> PipelineResult<()> {
        self.kv.set(&Self::cancel_key(run), &run.run_id)
    }

    /// Whether a cancel request targets this exact run.
    pub fn cancel_requested(&self, run: &Run) -> PipelineResult<bool> {
        Ok(self.kv.get(&Self::cancel_key(run))?.as_deref() == Some(run.run_id.as_str()))
    }

    /// Drop a pending request once `run` is terminal. Requests for other runs stay.
    pub fn clear_cancel(&self, run: &Run) -> PipelineResult<()> {
        if self.cancel_requested(run)? {
            self.kv.delete(&Self::cancel_key(run))?;
        }
        Ok(())
    }

    pub fn latest_run(&self, project_id: &str) -> PipelineResult<Option<Run>> {
        get_json(self.kv.as_ref(), &keys::run_key(project_id))
    }

    pub fn job(&self, job_id: &str) -> PipelineResult<Option<Run>> {
        get_json(self.kv.as_ref(), &keys::job_key(job_id))
    }

    /// Point the project's latest-job pointer at `job_id` and move it to the
    /// front of the recent-job list (deduplicated, capped at `cap`).
    pub fn record_job_started(
        &self,
        project_id: &str,
        job_id: &str,
        cap: usize,
    ) -> PipelineResult<Vec<String>> {
        self.kv.set(&keys::last_job_key(project_id), job_id)?;

        let list_key = keys::job_list_key(project_id);
        // A corrupt list is replaced rather than blocking new jobs.
        let prev: Vec<String> = get_json(self.kv.as_ref(), &list_key)
            .ok()
            .flatten()
            .unwrap_or_default();
        let next = push_front_capped(prev, job_id.to_string(), cap);
        set_json(self.kv.as_ref(), &list_key, &next)?;
        Ok(next)
    }

    pub fn latest_job_id(&self, project_id: &str) -> PipelineResult<Option<String>> {
        self.kv.get(&keys::last_job_key(project_id))
    }

    pub fn latest_job(&self, project_id: &str) -> PipelineResult<Option<Run>> {
        match self.latest_job_id(project_id)? {
            Some(id) => self.job(&id),
            None => Ok(None),
        }
    }

    pub fn recent_job_ids(&self, project_id: &str) -> PipelineResult<Vec<String>> {
        Ok(get_json(self.kv.as_ref(), &keys::job_list_key(project_id))?.unwrap_or_default())
    }
}

/// Newest first, duplicates removed before re-insertion, at most `cap` items.
pub(crate) fn push_front_capped<T: PartialEq>(prev: Vec<T>, item: T, cap: usize) -> Vec<T> {
    let mut next = Vec::with_capacity(prev.len() + 1);
    let rest: Vec<T> = prev.into_iter().filter(|x| *x != item).collect();
    next.push(item);
    next.extend(rest);
    next.truncate(cap);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Preset, StepName};
    use crate::store::MemoryKv;

    fn store() -> RunStore {
        RunStore::new(Arc::new(MemoryKv::new()))
    }

    #[test]
    fn test_push_front_capped_dedupes() {
        let out = push_front_capped(vec!["b", "a", "c"], "a", 10);
        assert_eq!(out, vec!["a", "b", "c"]);
        let out = push_front_capped(vec!["b", "c"], "a", 2);
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn test_save_run_mode_uses_latest_key() {
        let s = store();
        let mut run = Run::new("run_1", "acme", RunMode::Run, Preset::Seo, Preset::Seo.defaults());
        s.save(&run).unwrap();
        run.begin_step(StepName::Seed);
        s.save(&run).unwrap();

        let loaded = s.latest_run("acme").unwrap().unwrap();
        assert_eq!(loaded.steps.len(), 1);
    }

    #[test]
    fn test_job_index_newest_first() {
        let s = store();
        for id in ["job_a", "job_b", "job_a"] {
            let run = Run::new(id, "acme", RunMode::Job, Preset::Full, Preset::Full.defaults());
            s.save(&run).unwrap();
            s.record_job_started("acme", id, 50).unwrap();
        }
        assert_eq!(s.recent_job_ids("acme").unwrap(), vec!["job_a", "job_b"]);
        assert_eq!(s.latest_job_id("acme").unwrap().as_deref(), Some("job_a"));
        assert_eq!(s.latest_job("acme").unwrap().unwrap().run_id, "job_a");
        assert!(s.latest_run("acme").unwrap().is_none());
    }

    #[test]
    fn test_job_list_cap() {
        let s = store();
        for i in 0..5 {
            s.record_job_started("acme", &format!("job_{i}"), 3).unwrap();
        }
        assert_eq!(
            s.recent_job_ids("acme").unwrap(),
            vec!["job_4", "job_3", "job_2"]
        );
    }

    #[test]
    fn test_cancel_request_targets_one_run() {
        let s = store();
        let first = Run::new("run_1", "acme", RunMode::Run, Preset::Seo, Preset::Seo.defaults());
        let second = Run::new("run_2", "acme", RunMode::Run, Preset::Seo, Preset::Seo.defaults());
        s.save(&first).unwrap();
        s.request_cancel(&first).unwrap();

        assert!(s.cancel_requested(&first).unwrap());
        assert!(!s.cancel_requested(&second).unwrap());
        // The Run document is untouched.
        assert_eq!(s.latest_run("acme").unwrap().unwrap(), first);

        s.clear_cancel(&second).unwrap();
        assert!(s.cancel_requested(&first).unwrap());
        s.clear_cancel(&first).unwrap();
        assert!(!s.cancel_requested(&first).unwrap());
    }

    #[test]
    fn test_corrupt_job_list_is_replaced() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(&keys::job_list_key("acme"), "not-json").unwrap();
        let s = RunStore::new(kv);
        let next = s.record_job_started("acme", "job_x", 50).unwrap();
        assert_eq!(next, vec!["job_x"]);
    }
}
