//! In-memory storage backed by a `BTreeMap`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::{list_prefix, validate_key, Storage};
use crate::error::{IssuerError, Result};

/// Thread-safe in-process store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned() -> IssuerError {
    IssuerError::StorageError("memory storage lock poisoned".into())
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = list_prefix(prefix);
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut children = BTreeSet::new();
        for key in entries
            .range(prefix.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(&prefix))
        {
            let rest = &key[prefix.len()..];
            match rest.find('/') {
                Some(idx) => children.insert(rest[..=idx].to_string()),
                None => children.insert(rest.to_string()),
            };
        }
        Ok(children.into_iter().collect())
    }
}
