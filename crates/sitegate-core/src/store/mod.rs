//! Key-value document store.
//!
//! Documents are JSON strings stored under flat keys. Writes replace the
//! whole value; there is no partial patching anywhere.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{PipelineError, PipelineResult};

pub mod keys;
pub mod runs;
pub mod schema;
pub mod sqlite;

pub use runs::RunStore;
pub use sqlite::SqliteKv;

/// Durable keyed storage with replace-whole-document semantics.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> PipelineResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PipelineResult<()>;

    /// Returns whether a value was removed.
    fn delete(&self, key: &str) -> PipelineResult<bool>;

    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> PipelineResult<Vec<String>>;
}

/// Read a JSON document; `None` when the key is absent.
pub fn get_json<T: serde::de::DeserializeOwned>(
    kv: &dyn KvStore,
    key: &str,
) -> PipelineResult<Option<T>> {
    match kv.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn set_json<T: serde::Serialize>(kv: &dyn KvStore, key: &str, value: &T) -> PipelineResult<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

/// In-process store. Used by tests and `--memory` runs.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: Mutex<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PipelineResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.inner
            .lock()
            .map_err(|_| PipelineError::store("memory store lock poisoned"))
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> PipelineResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PipelineResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> PipelineResult<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_kv_replaces_whole_value() {
        let kv = MemoryKv::new();
        kv.set("a", "{\"x\":1}").unwrap();
        kv.set("a", "{\"y\":2}").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("{\"y\":2}"));
        assert!(kv.delete("a").unwrap());
        assert!(!kv.delete("a").unwrap());
        assert!(kv.get("a").unwrap().is_none());
    }

    #[test]
    fn test_json_helpers_roundtrip_absent() {
        let kv = MemoryKv::new();
        let missing: Option<Vec<String>> = get_json(&kv, "nope").unwrap();
        assert!(missing.is_none());

        set_json(&kv, "ids", &vec!["a".to_string()]).unwrap();
        let ids: Vec<String> = get_json(&kv, "ids").unwrap().unwrap();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_corrupt_document_is_store_error() {
        let kv = MemoryKv::new();
        kv.set("bad", "{not json").unwrap();
        let res: PipelineResult<Option<Vec<String>>> = get_json(&kv, "bad");
        assert!(matches!(res, Err(PipelineError::Store { .. })));
    }
}
