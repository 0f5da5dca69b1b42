//! Issue orchestration: the operator → account → user lifecycle.
//!
//! Every mutation stores the caller's issue record first, then derives key
//! material and tokens from it, then re-signs whatever depends on what
//! changed:
//!
//! - operator issued: re-sign the operator token and every account token;
//!   optionally create the system account and push user.
//! - account issued or deleted: re-sign the operator token when it is the
//!   system account; notify the resolver.
//! - user deleted: revoke the user in the account ledger and re-sign the
//!   account token *before* removing its key.
//!
//! Nothing here is transactional. Steps are ordered so that an interrupted
//! cascade leaves a user over-revoked rather than under-revoked, and every
//! step is safe to repeat.

pub mod account;
pub mod operator;
pub mod types;
pub mod user;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keys::KeyStore;
use crate::paths::IdentityPath;
use crate::resolver::{AccountResolver, AccountResolverUpdate, NoopResolver};
use crate::storage::{get_json, list_leaves, put_json, Storage};

pub use types::{
    AccountIssue, AccountStatus, IssueStatus, NkeyStatus, OperatorIssue, OperatorStatus,
    UserIssue, UserStatus, DEFAULT_PUSH_USER, DEFAULT_SYS_ACCOUNT,
};

/// Stored token record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenRecord {
    jwt: String,
}

/// The issuing engine.
///
/// Holds no state besides its storage and resolver; every call reads what
/// it needs. Cheap to share across threads behind an `Arc`.
pub struct NatsIssuer {
    storage: Arc<dyn Storage>,
    keys: KeyStore,
    resolver: Arc<dyn AccountResolver>,
}

impl NatsIssuer {
    /// Create an engine over `storage` that does not notify any resolver.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_resolver(storage, Arc::new(NoopResolver))
    }

    pub fn with_resolver(storage: Arc<dyn Storage>, resolver: Arc<dyn AccountResolver>) -> Self {
        Self {
            keys: KeyStore::new(storage.clone()),
            storage,
            resolver,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The key material store.
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    // ── Records ───────────────────────────────────────────────────────────────

    fn read_record<T: DeserializeOwned>(&self, path: &IdentityPath) -> Result<Option<T>> {
        get_json(self.storage.as_ref(), &path.issue_key())
    }

    fn write_record<T: Serialize>(&self, path: &IdentityPath, record: &T) -> Result<()> {
        put_json(self.storage.as_ref(), &path.issue_key(), record)
    }

    fn delete_record(&self, path: &IdentityPath) -> Result<()> {
        self.storage.delete(&path.issue_key())
    }

    /// Names of the children of `parent` that have issue records.
    fn list_children(&self, parent: &IdentityPath) -> Result<Vec<String>> {
        match parent.children_prefix("issue") {
            Some(prefix) => list_leaves(self.storage.as_ref(), &prefix),
            None => Ok(Vec::new()),
        }
    }

    /// Names of the children of `parent` that have an issue record or an
    /// nkey, so that deletes also sweep partially removed identities.
    fn list_stored_children(&self, parent: &IdentityPath) -> Result<Vec<String>> {
        let mut names = self.list_children(parent)?;
        if let Some(prefix) = parent.children_prefix("nkey") {
            names.extend(list_leaves(self.storage.as_ref(), &prefix)?);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    // ── Tokens ────────────────────────────────────────────────────────────────

    fn store_token(&self, path: &IdentityPath, jwt: String) -> Result<()> {
        if let Some(key) = path.jwt_key() {
            put_json(self.storage.as_ref(), &key, &TokenRecord { jwt })?;
        }
        Ok(())
    }

    fn delete_token(&self, path: &IdentityPath) -> Result<()> {
        match path.jwt_key() {
            Some(key) => self.storage.delete(&key),
            None => Ok(()),
        }
    }

    /// The stored token of an operator or account. Users have none.
    pub fn read_jwt(&self, path: &IdentityPath) -> Result<Option<String>> {
        let Some(key) = path.jwt_key() else {
            return Ok(None);
        };
        Ok(get_json::<TokenRecord>(self.storage.as_ref(), &key)?.map(|r| r.jwt))
    }

    /// Names of the identities below `parent` that have a stored token.
    pub fn list_jwts(&self, parent: Option<&IdentityPath>) -> Result<Vec<String>> {
        let prefix = match parent {
            None => Some("jwt/operator/".to_string()),
            Some(p) => p.children_prefix("jwt"),
        };
        match prefix {
            Some(prefix) => list_leaves(self.storage.as_ref(), &prefix),
            None => Ok(Vec::new()),
        }
    }

    /// Names of the identities below `parent` that have an nkey.
    pub fn list_nkeys(&self, parent: Option<&IdentityPath>) -> Result<Vec<String>> {
        let prefix = match parent {
            None => Some("nkey/operator/".to_string()),
            Some(p) => p.children_prefix("nkey"),
        };
        match prefix {
            Some(prefix) => list_leaves(self.storage.as_ref(), &prefix),
            None => Ok(Vec::new()),
        }
    }

    // ── Resolver ──────────────────────────────────────────────────────────────

    /// Push the operator's account tokens to the resolver.
    ///
    /// Runs after the caller's writes have landed, so a failed push is
    /// logged and never fails the surrounding issue or delete.
    fn notify_resolver(&self, operator: &OperatorIssue) {
        if let Err(e) = self.try_notify_resolver(operator) {
            tracing::warn!(
                operator = %operator.operator,
                error = %e,
                "resolver update failed"
            );
        }
    }

    /// Push the operator's account tokens to the resolver, if the operator
    /// asks for it and the push user exists.
    fn try_notify_resolver(&self, operator: &OperatorIssue) -> Result<()> {
        if !operator.sync_account_server {
            tracing::debug!(operator = %operator.operator, "account server sync disabled");
            return Ok(());
        }
        let push_path = IdentityPath::user(
            &operator.operator,
            &operator.system_account,
            DEFAULT_PUSH_USER,
        )?;
        if self.read_record::<UserIssue>(&push_path)?.is_none() {
            tracing::info!(
                operator = %operator.operator,
                "push user does not exist, skipping resolver update"
            );
            return Ok(());
        }

        let push = self.generate_user_creds(
            &operator.operator,
            &operator.system_account,
            DEFAULT_PUSH_USER,
            &BTreeMap::new(),
        )?;

        let op_path = IdentityPath::operator(&operator.operator)?;
        let mut account_jwts = BTreeMap::new();
        for account in self.list_children(&op_path)? {
            let path = IdentityPath::account(&operator.operator, &account)?;
            if let Some(jwt) = self.read_jwt(&path)? {
                account_jwts.insert(account, jwt);
            }
        }

        tracing::info!(
            operator = %operator.operator,
            accounts = account_jwts.len(),
            "pushing accounts to resolver"
        );
        self.resolver.push(&AccountResolverUpdate {
            operator: operator.operator.clone(),
            push_creds: push.creds,
            account_jwts,
        })
    }
}
