//! Issue records: what the caller asked for plus the derived status.
//!
//! The same structs are the stored record, the request body and the
//! response body. Field names are camelCase on the wire. Identifiers in a
//! request body are ignored in favour of the ones in the path, and a
//! caller-supplied `status` is discarded.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::{AccountClaims, OperatorClaims, UserClaims};
use crate::error::{IssuerError, Result};
use crate::paths::validate_identifier;
use crate::time::now_unix;

/// Name of the system account created by `createSystemAccount`.
pub const DEFAULT_SYS_ACCOUNT: &str = "sys";
/// User in the system account whose credentials are pushed to resolvers.
pub const DEFAULT_PUSH_USER: &str = "default-push";

fn default_sys_account() -> String {
    DEFAULT_SYS_ACCOUNT.to_string()
}

/// Whether an identity's nkey and token exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub nkey: bool,
    pub jwt: bool,
}

/// User status. User tokens are never stored, so only the nkey is tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NkeyStatus {
    pub nkey: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorStatus {
    pub operator: IssueStatus,
    #[serde(default)]
    pub signing_keys: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub account: IssueStatus,
    #[serde(default)]
    pub signing_keys: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user: NkeyStatus,
}

/// Operator issue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorIssue {
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub claims_template: OperatorClaims,
    /// Names of the operator signing keys to maintain.
    #[serde(default)]
    pub signing_keys: Vec<String>,
    /// Name of the system account.
    #[serde(default = "default_sys_account")]
    pub system_account: String,
    #[serde(default)]
    pub create_system_account: bool,
    /// Push account tokens to the resolver on change.
    #[serde(default)]
    pub sync_account_server: bool,
    #[serde(default)]
    pub status: OperatorStatus,
}

impl Default for OperatorIssue {
    fn default() -> Self {
        Self {
            operator: String::new(),
            claims_template: OperatorClaims::default(),
            signing_keys: Vec::new(),
            system_account: default_sys_account(),
            create_system_account: false,
            sync_account_server: false,
            status: OperatorStatus::default(),
        }
    }
}

/// Account issue record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIssue {
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub account: String,
    /// Operator signing key that signs this account's token.
    #[serde(default)]
    pub use_signing_key: String,
    #[serde(default)]
    pub claims_template: AccountClaims,
    /// Names of the account signing keys to maintain.
    #[serde(default)]
    pub signing_keys: Vec<String>,
    #[serde(default)]
    pub status: AccountStatus,
}

/// User issue record. The claims template may contain placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIssue {
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub user: String,
    /// Account signing key that signs this user's tokens.
    #[serde(default)]
    pub use_signing_key: String,
    #[serde(default)]
    pub claims_template: UserClaims,
    /// Lifetime of generated tokens in seconds; zero means no expiry.
    #[serde(default)]
    pub expiration_s: i64,
    #[serde(default)]
    pub status: UserStatus,
}

// ── Request / response marshalling ────────────────────────────────────────────

fn from_body<T: DeserializeOwned + Default>(data: &Value) -> Result<T> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data.clone())
        .map_err(|e| IssuerError::Validation(format!("invalid request body: {e}")))
}

fn to_body<T: Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| IssuerError::SerializationError(e.to_string()))
}

fn validate_names(kind: &str, names: &[String]) -> Result<()> {
    for name in names {
        validate_identifier(kind, name)?;
    }
    Ok(())
}

fn validate_optional(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        Ok(())
    } else {
        validate_identifier(kind, name)
    }
}

impl OperatorIssue {
    /// Build the issue requested for `operator` from a request body.
    pub fn from_request(operator: &str, data: &Value) -> Result<Self> {
        let mut issue: Self = from_body(data)?;
        issue.operator = operator.to_string();
        issue.status = OperatorStatus::default();
        if issue.system_account.is_empty() {
            issue.system_account = default_sys_account();
        }
        issue.validate()?;
        Ok(issue)
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier("operator", &self.operator)?;
        validate_identifier("account", &self.system_account)?;
        validate_names("signing key", &self.signing_keys)
    }

    pub fn to_response(&self) -> Result<Value> {
        to_body(self)
    }
}

impl AccountIssue {
    /// Build the issue requested for `operator/account` from a request body.
    pub fn from_request(operator: &str, account: &str, data: &Value) -> Result<Self> {
        let mut issue: Self = from_body(data)?;
        issue.operator = operator.to_string();
        issue.account = account.to_string();
        issue.status = AccountStatus::default();
        issue.validate()?;
        Ok(issue)
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier("operator", &self.operator)?;
        validate_identifier("account", &self.account)?;
        validate_optional("signing key", &self.use_signing_key)?;
        validate_names("signing key", &self.signing_keys)
    }

    pub fn to_response(&self) -> Result<Value> {
        to_body(self)
    }
}

impl UserIssue {
    /// Build the issue requested for `operator/account/user` from a request
    /// body.
    pub fn from_request(operator: &str, account: &str, user: &str, data: &Value) -> Result<Self> {
        let mut issue: Self = from_body(data)?;
        issue.operator = operator.to_string();
        issue.account = account.to_string();
        issue.user = user.to_string();
        issue.status = UserStatus::default();
        issue.validate()?;
        Ok(issue)
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier("operator", &self.operator)?;
        validate_identifier("account", &self.account)?;
        validate_identifier("user", &self.user)?;
        validate_optional("signing key", &self.use_signing_key)?;
        if self.expiration_s < 0 {
            return Err(IssuerError::Validation(format!(
                "expirationS must not be negative, got {}",
                self.expiration_s
            )));
        }
        if now_unix().checked_add(self.expiration_s).is_none() {
            return Err(IssuerError::Validation(format!(
                "expirationS is out of range, got {}",
                self.expiration_s
            )));
        }
        Ok(())
    }

    pub fn to_response(&self) -> Result<Value> {
        to_body(self)
    }
}
