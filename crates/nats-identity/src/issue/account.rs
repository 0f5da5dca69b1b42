//! Account issue, refresh and delete.

use crate::error::{IssuerError, Result};
use crate::ledger;
use crate::paths::IdentityPath;
use crate::token;

use super::types::{AccountIssue, IssueStatus, OperatorIssue};
use super::NatsIssuer;

impl NatsIssuer {
    /// Create or update an account.
    ///
    /// The operator must already be issued. The caller's revocation ledger
    /// is merged into the stored one, so an update never shrinks it.
    pub fn issue_account(&self, mut issue: AccountIssue) -> Result<AccountIssue> {
        issue.validate()?;
        let path = IdentityPath::account(&issue.operator, &issue.account)?;
        tracing::info!(operator = %issue.operator, account = %issue.account, "issue account");

        let mut operator = self.require_operator(&issue.operator)?;

        if let Some(stored) = self.read_record::<AccountIssue>(&path)? {
            ledger::merge(
                &mut issue.claims_template.nats.revocations,
                &stored.claims_template.nats.revocations,
            );
            issue.status = stored.status;
        }
        self.write_record(&path, &issue)?;

        self.refresh_account(&mut issue)?;

        if issue.account == operator.system_account {
            self.refresh_operator(&mut operator)?;
        }

        self.notify_resolver(&operator);
        self.read_account(&issue.operator, &issue.account)?
            .ok_or_else(|| IssuerError::IssueNotFound(path.to_string()))
    }

    pub(crate) fn require_operator(&self, operator: &str) -> Result<OperatorIssue> {
        self.read_operator(operator)?
            .ok_or_else(|| IssuerError::ParentNotFound(format!("operator {operator}")))
    }

    /// Ensure keys, rebuild the account token and persist the status.
    pub(crate) fn refresh_account(&self, issue: &mut AccountIssue) -> Result<()> {
        let path = IdentityPath::account(&issue.operator, &issue.account)?;
        let op_path = IdentityPath::operator(&issue.operator)?;

        let (key_pair, created) = self.keys.ensure(&path)?;
        if created {
            tracing::info!(operator = %issue.operator, account = %issue.account, "account nkey assigned");
        }
        let signing_keys = self.keys.sync_signing(&path, &issue.signing_keys)?;

        let signer = if issue.use_signing_key.is_empty() {
            self.keys
                .get(&op_path)?
                .ok_or_else(|| IssuerError::OperatorKeyMissing(issue.operator.clone()))?
        } else {
            self.keys
                .get_signing(&op_path, &issue.use_signing_key)?
                .ok_or_else(|| {
                    IssuerError::SigningKeyNotFound(format!(
                        "operator {} signing key {}",
                        issue.operator, issue.use_signing_key
                    ))
                })?
        };

        let mut claims = issue.claims_template.clone();
        if claims.data.name.is_empty() {
            claims.data.name = issue.account.clone();
        }
        claims.nats.signing_keys = signing_keys;

        let signed = token::build(claims, &key_pair.public_key(), &signer, None, None)?;
        self.store_token(&path, signed.token)?;

        issue.status.account = IssueStatus {
            nkey: true,
            jwt: true,
        };
        issue.status.signing_keys = issue
            .signing_keys
            .iter()
            .map(|name| (name.clone(), true))
            .collect();
        self.write_record(&path, issue)
    }

    /// Revoke `user_public_key` in the account ledger and re-sign the token.
    pub(crate) fn revoke_in_account(
        &self,
        issue: &mut AccountIssue,
        user_public_key: &str,
        at: i64,
    ) -> Result<()> {
        let claims = std::mem::take(&mut issue.claims_template);
        issue.claims_template = ledger::revoke(claims, user_public_key, at);
        let path = IdentityPath::account(&issue.operator, &issue.account)?;
        self.write_record(&path, issue)?;
        self.refresh_account(issue)
    }

    pub fn read_account(&self, operator: &str, account: &str) -> Result<Option<AccountIssue>> {
        self.read_record(&IdentityPath::account(operator, account)?)
    }

    /// Names of the accounts under `operator`.
    pub fn list_accounts(&self, operator: &str) -> Result<Vec<String>> {
        self.list_children(&IdentityPath::operator(operator)?)
    }

    /// Delete an account with all its users and keys.
    ///
    /// Users removed this way are not added to the ledger; it goes away with
    /// the account. Deleting an absent account is not an error.
    pub fn delete_account(&self, operator: &str, account: &str) -> Result<()> {
        let path = IdentityPath::account(operator, account)?;
        tracing::info!(operator, account, "delete account");
        self.purge_account(&path)?;

        if let Some(mut op) = self.read_operator(operator)? {
            if op.system_account == account {
                self.refresh_operator(&mut op)?;
            }
            self.notify_resolver(&op);
        }
        Ok(())
    }

    /// Remove everything stored for an account, users first.
    pub(crate) fn purge_account(&self, path: &IdentityPath) -> Result<()> {
        if let IdentityPath::Account { operator, account } = path {
            for user in self.list_stored_children(path)? {
                let user_path = IdentityPath::user(operator, account, &user)?;
                self.keys.delete(&user_path)?;
                self.delete_record(&user_path)?;
            }
        }
        self.keys.delete_all_signing(path)?;
        self.delete_token(path)?;
        self.keys.delete(path)?;
        self.delete_record(path)
    }
}
