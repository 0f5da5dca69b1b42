//! Key material store: nkey seeds for every identity and signing key.
//!
//! Each seed is stored as its own record:
//!
//! ```json
//! {
//!     "version": 1,
//!     "record": { "seed": "SA..." }
//! }
//! ```
//!
//! Public keys are never stored; they are derived from the seed on load.
//! A stored seed that fails to decode, or whose role does not match its
//! location, is an error. The store never regenerates over it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::nkey::{KeyRole, NKeyPair};
use crate::error::{IssuerError, Result};
use crate::paths::{validate_identifier, IdentityPath};
use crate::storage::{get_json, list_leaves, put_json, Storage};

// ── Stored record ─────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct NkeyRecord {
    seed: String,
}

// ── KeyStore ──────────────────────────────────────────────────────────────────

/// Creates, loads and deletes nkeys below `nkey/`.
#[derive(Clone)]
pub struct KeyStore {
    storage: Arc<dyn Storage>,
}

impl KeyStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn load(&self, key: &str, role: KeyRole) -> Result<Option<NKeyPair>> {
        let Some(record) = get_json::<NkeyRecord>(self.storage.as_ref(), key)? else {
            return Ok(None);
        };
        let key_pair = NKeyPair::from_seed(&record.seed)
            .map_err(|e| IssuerError::InvalidKey(format!("stored seed at {key}: {e}")))?;
        if key_pair.role() != role {
            return Err(IssuerError::InvalidKey(format!(
                "stored seed at {key} has role {}, expected {}",
                key_pair.role().as_str(),
                role.as_str()
            )));
        }
        Ok(Some(key_pair))
    }

    fn ensure_at(&self, key: &str, role: KeyRole) -> Result<(NKeyPair, bool)> {
        if let Some(existing) = self.load(key, role)? {
            return Ok((existing, false));
        }
        let key_pair = NKeyPair::generate(role);
        put_json(
            self.storage.as_ref(),
            key,
            &NkeyRecord {
                seed: key_pair.seed()?,
            },
        )?;
        tracing::info!(key, public_key = %key_pair.public_key(), "created nkey");
        Ok((key_pair, true))
    }

    /// Return the identity's key pair, creating it on first use.
    ///
    /// The boolean is `true` when the key was created by this call.
    pub fn ensure(&self, path: &IdentityPath) -> Result<(NKeyPair, bool)> {
        self.ensure_at(&path.nkey_key(), path.role())
    }

    /// Load the identity's key pair.
    pub fn get(&self, path: &IdentityPath) -> Result<Option<NKeyPair>> {
        self.load(&path.nkey_key(), path.role())
    }

    /// The identity's public key, if its nkey exists.
    pub fn public_key(&self, path: &IdentityPath) -> Result<Option<String>> {
        Ok(self.get(path)?.map(|kp| kp.public_key()))
    }

    /// Delete the identity's key. Absent keys are ignored.
    pub fn delete(&self, path: &IdentityPath) -> Result<()> {
        self.storage.delete(&path.nkey_key())
    }

    // ── Signing keys ──────────────────────────────────────────────────────────

    fn signing_key_path(owner: &IdentityPath, name: &str) -> Result<String> {
        if matches!(owner, IdentityPath::User { .. }) {
            return Err(IssuerError::Validation(
                "users do not have signing keys".into(),
            ));
        }
        validate_identifier("signing key", name)?;
        Ok(format!("{}{name}", owner.signing_prefix()))
    }

    /// Return the named signing key of `owner`, creating it on first use.
    pub fn ensure_signing(&self, owner: &IdentityPath, name: &str) -> Result<(NKeyPair, bool)> {
        self.ensure_at(&Self::signing_key_path(owner, name)?, owner.role())
    }

    /// Load the named signing key of `owner`.
    pub fn get_signing(&self, owner: &IdentityPath, name: &str) -> Result<Option<NKeyPair>> {
        self.load(&Self::signing_key_path(owner, name)?, owner.role())
    }

    pub fn delete_signing(&self, owner: &IdentityPath, name: &str) -> Result<()> {
        self.storage.delete(&Self::signing_key_path(owner, name)?)
    }

    /// Names of `owner`'s signing keys, sorted.
    pub fn list_signing(&self, owner: &IdentityPath) -> Result<Vec<String>> {
        list_leaves(self.storage.as_ref(), &owner.signing_prefix())
    }

    /// Make `owner`'s signing keys exactly `names`: create the listed ones
    /// and delete the rest. Returns the public keys in `names` order.
    pub fn sync_signing(&self, owner: &IdentityPath, names: &[String]) -> Result<Vec<String>> {
        let mut public_keys = Vec::with_capacity(names.len());
        for name in names {
            let (key_pair, _) = self.ensure_signing(owner, name)?;
            public_keys.push(key_pair.public_key());
        }
        for existing in self.list_signing(owner)? {
            if !names.contains(&existing) {
                self.delete_signing(owner, &existing)?;
                tracing::info!(owner = %owner, signing_key = %existing, "deleted signing nkey");
            }
        }
        Ok(public_keys)
    }

    /// Delete every signing key of `owner`.
    pub fn delete_all_signing(&self, owner: &IdentityPath) -> Result<()> {
        for name in self.list_signing(owner)? {
            self.delete_signing(owner, &name)?;
        }
        Ok(())
    }
}
