//! Per-project advisory lock around "begin run".
//!
//! Scope is one `Orchestrator` (and its clones); separate processes are
//! not excluded.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Releases the project's lock on drop.
#[derive(Debug)]
pub struct ProjectGuard {
    active: Arc<Mutex<HashSet<String>>>,
    project_id: String,
}

impl ProjectLocks {
    pub fn try_acquire(&self, project_id: &str) -> PipelineResult<ProjectGuard> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| PipelineError::store("project lock table poisoned"))?;
        if !active.insert(project_id.to_string()) {
            return Err(PipelineError::RunInProgress {
                project_id: project_id.to_string(),
            });
        }
        Ok(ProjectGuard {
            active: Arc::clone(&self.active),
            project_id: project_id.to_string(),
        })
    }

    pub fn is_locked(&self, project_id: &str) -> bool {
        self.active
            .lock()
            .map(|a| a.contains(project_id))
            .unwrap_or(false)
    }
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.project_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_released() {
        let locks = ProjectLocks::default();
        let guard = locks.try_acquire("acme").unwrap();
        assert!(matches!(
            locks.try_acquire("acme"),
            Err(PipelineError::RunInProgress { .. })
        ));
        assert!(locks.try_acquire("other").is_ok());
        drop(guard);
        assert!(!locks.is_locked("acme"));
        assert!(locks.try_acquire("acme").is_ok());
    }
}
