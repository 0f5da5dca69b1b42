//! Storage layer: the key-value contract the issuer runs on.
//!
//! The issuer needs exactly four primitives: get, put, delete and
//! list-by-prefix. There are no transactions; each key is last-write-wins.
//!
//! # Key layout
//!
//! ```text
//! issue/operator/{op}                                  operator issue record
//! issue/operator/{op}/account/{acc}                    account issue record
//! issue/operator/{op}/account/{acc}/user/{user}        user issue record
//! nkey/operator/{op}[/signing/{name}]                  operator (signing) seed
//! nkey/operator/{op}/account/{acc}[/signing/{name}]    account (signing) seed
//! nkey/operator/{op}/account/{acc}/user/{user}         user seed
//! jwt/operator/{op}[/account/{acc}]                    operator/account token
//! ```
//!
//! # Modules
//!
//! - [`memory`]: in-process `BTreeMap` store.
//! - [`directory`]: one JSON file per key under a root directory.
//! - [`sealed`]: wrapper that encrypts values under a passphrase.

pub mod directory;
pub mod memory;
pub mod sealed;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{IssuerError, Result};

pub use directory::DirectoryStorage;
pub use memory::MemoryStorage;
pub use sealed::SealedStorage;

// ── Record format ─────────────────────────────────────────────────────────────

const RECORD_VERSION: u32 = 1;

/// Wrapper written for each JSON record.
#[derive(Debug, Serialize, Deserialize)]
struct RecordEnvelope<T> {
    /// Format version number.
    version: u32,
    /// The stored record.
    record: T,
}

// ── Storage contract ──────────────────────────────────────────────────────────

/// A flat key-value store with hierarchical `/`-delimited keys.
pub trait Storage: Send + Sync {
    /// Read the value at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` at `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// List the direct children of `prefix`, sorted.
    ///
    /// Leaf entries are returned by name; entries that have children of
    /// their own are additionally returned with a trailing `/`.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Normalize a list prefix so that it ends with exactly one `/`.
pub(crate) fn list_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}

/// Reject keys that cannot be mapped onto a hierarchy safely.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(IssuerError::Validation(format!("invalid storage key: {key:?}")));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(IssuerError::Validation(format!("invalid storage key: {key:?}")));
    }
    Ok(())
}

/// Read and deserialize a JSON record.
pub fn get_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>> {
    let Some(bytes) = storage.get(key)? else {
        return Ok(None);
    };
    let envelope: RecordEnvelope<T> = serde_json::from_slice(&bytes).map_err(|e| {
        IssuerError::SerializationError(format!("failed to parse record {key}: {e}"))
    })?;
    if envelope.version != RECORD_VERSION {
        return Err(IssuerError::SerializationError(format!(
            "unsupported record version {} at {key}",
            envelope.version
        )));
    }
    Ok(Some(envelope.record))
}

/// Serialize and write a JSON record.
pub fn put_json<T: Serialize>(storage: &dyn Storage, key: &str, record: &T) -> Result<()> {
    let envelope = RecordEnvelope {
        version: RECORD_VERSION,
        record,
    };
    let json = serde_json::to_vec(&envelope)
        .map_err(|e| IssuerError::SerializationError(e.to_string()))?;
    storage.put(key, &json)
}

/// List leaf names directly under `prefix`, dropping subtree markers.
pub fn list_leaves(storage: &dyn Storage, prefix: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = storage
        .list(prefix)?
        .into_iter()
        .filter(|name| !name.ends_with('/'))
        .collect();
    names.sort();
    Ok(names)
}
