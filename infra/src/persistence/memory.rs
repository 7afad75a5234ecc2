use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::Result;
use log::*;
use serde_json::Value;

use super::{stamp, Storage};
use crate::documents::Version;

/// Keeps every record in process memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.borrow().keys().cloned().collect()
    }
}

impl Storage for MemoryStore {
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.borrow().get(key).cloned())
    }

    fn store(&self, key: &str, body: &Value, expected: &Version) -> Result<Version> {
        let mut records = self.records.borrow_mut();
        let (body, version) = stamp(key, records.get(key), body, expected)?;
        trace!("memory store {} -> {}", key, version);
        records.insert(key.to_string(), body);
        Ok(version)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::persistence::test as shared;

    #[test]
    fn save_load() {
        shared::should_save_and_load(&MemoryStore::new());
    }

    #[test]
    fn load_missing_document_should_return_none() {
        shared::should_return_none_for_missing(&MemoryStore::new());
    }

    #[test]
    fn should_update_on_overwrite() {
        shared::should_update_on_overwrite(&MemoryStore::new());
    }

    #[test]
    fn should_fail_on_overwrite_with_new() {
        shared::should_fail_on_overwrite_with_new(&MemoryStore::new());
    }

    #[test]
    fn should_fail_on_stale_version() {
        shared::should_fail_on_stale_version(&MemoryStore::new());
    }

    #[test]
    fn keys_are_listed_in_order() {
        let store = MemoryStore::new();
        for key in &["b", "a"] {
            store
                .store(key, &serde_json::json!({}), &Version::default())
                .expect("store");
        }
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
