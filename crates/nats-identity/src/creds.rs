//! On-demand user credentials.
//!
//! Every read instantiates the stored user template with the caller's
//! parameters, signs a fresh token and returns it bundled with the user
//! seed. Nothing is written.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::UserClaims;
use crate::error::{IssuerError, Result};
use crate::issue::{NatsIssuer, UserIssue};
use crate::paths::IdentityPath;
use crate::template;
use crate::token;

/// A generated credentials bundle and what it was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreds {
    pub operator: String,
    pub account: String,
    pub user: String,
    pub creds: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl UserCreds {
    pub fn to_response(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| IssuerError::SerializationError(e.to_string()))
    }
}

impl NatsIssuer {
    /// Generate fresh credentials for a user template.
    ///
    /// # Errors
    ///
    /// - `UserTemplateNotFound` if no template is stored for the user.
    /// - `MissingParameters` / `TemplateMalformed` from instantiation.
    /// - `SigningKeyNotFound` if the template names an absent account
    ///   signing key, else `AccountKeyMissing` / `UserKeyMissing`.
    pub fn generate_user_creds(
        &self,
        operator: &str,
        account: &str,
        user: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<UserCreds> {
        let path = IdentityPath::user(operator, account, user)?;
        tracing::debug!(
            operator,
            account,
            user,
            parameters = parameters.len(),
            "generating user credentials"
        );

        let issue: UserIssue = self
            .read_user(operator, account, user)?
            .ok_or_else(|| IssuerError::UserTemplateNotFound {
                operator: operator.to_string(),
                account: account.to_string(),
                user: user.to_string(),
            })?;

        let claims: UserClaims = template::instantiate(&issue.claims_template, parameters)?;

        let account_path = IdentityPath::account(operator, account)?;
        let account_key = self
            .keys()
            .get(&account_path)?
            .ok_or_else(|| IssuerError::AccountKeyMissing(account_path.to_string()))?;

        let (signer, issuer_account) = if issue.use_signing_key.is_empty() {
            (account_key, None)
        } else {
            let signing_key = self
                .keys()
                .get_signing(&account_path, &issue.use_signing_key)?
                .ok_or_else(|| {
                    IssuerError::SigningKeyNotFound(format!(
                        "account {account_path} signing key {}",
                        issue.use_signing_key
                    ))
                })?;
            (signing_key, Some(account_key.public_key()))
        };

        let user_key = self
            .keys()
            .get(&path)?
            .ok_or_else(|| IssuerError::UserKeyMissing(path.to_string()))?;

        let signed = token::build(
            claims,
            &user_key.public_key(),
            &signer,
            issuer_account.as_deref(),
            Some(issue.expiration_s),
        )?;
        let creds = token::format_user_creds(&signed.token, &user_key.seed()?)?;

        Ok(UserCreds {
            operator: operator.to_string(),
            account: account.to_string(),
            user: user.to_string(),
            creds,
            parameters: parameters.clone(),
            expires_at: signed.expires_at,
        })
    }

    /// Names of the users for which credentials can be generated.
    pub fn list_user_creds(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        self.list_users(operator, account)
    }
}
