//! Account resolver hook.
//!
//! When resolver-visible state changes (an account token is re-signed or
//! the push user is issued) the engine hands an [`AccountResolverUpdate`]
//! to the configured [`AccountResolver`]. Delivering it to a messaging
//! server is up to the implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{IssuerError, Result};

/// Everything a resolver needs to publish an operator's accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountResolverUpdate {
    pub operator: String,
    /// Freshly generated credentials of the push user.
    pub push_creds: String,
    /// Account name → account token, for every account under the operator.
    pub account_jwts: BTreeMap<String, String>,
}

/// Receiver of account resolver updates.
pub trait AccountResolver: Send + Sync {
    fn push(&self, update: &AccountResolverUpdate) -> Result<()>;
}

/// Resolver that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl AccountResolver for NoopResolver {
    fn push(&self, update: &AccountResolverUpdate) -> Result<()> {
        tracing::debug!(
            operator = %update.operator,
            accounts = update.account_jwts.len(),
            "resolver update discarded"
        );
        Ok(())
    }
}

/// Resolver that keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    updates: Mutex<Vec<AccountResolverUpdate>>,
}

impl RecordingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates received so far, oldest first.
    pub fn updates(&self) -> Vec<AccountResolverUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// The most recent update.
    pub fn last(&self) -> Option<AccountResolverUpdate> {
        self.updates.lock().ok().and_then(|u| u.last().cloned())
    }
}

impl AccountResolver for RecordingResolver {
    fn push(&self, update: &AccountResolverUpdate) -> Result<()> {
        self.updates
            .lock()
            .map_err(|_| IssuerError::StorageError("resolver lock poisoned".into()))?
            .push(update.clone());
        Ok(())
    }
}
