//! Operator issue, refresh and delete.

use crate::error::{IssuerError, Result};
use crate::paths::IdentityPath;
use crate::token;

use super::types::{AccountIssue, IssueStatus, OperatorIssue, DEFAULT_PUSH_USER};
use super::{NatsIssuer, UserIssue};

impl NatsIssuer {
    /// Create or update an operator.
    ///
    /// Stores the record, (re)builds the self-signed operator token, re-signs
    /// every account under the operator and, if requested, creates the
    /// system account and its push user.
    pub fn issue_operator(&self, mut issue: OperatorIssue) -> Result<OperatorIssue> {
        issue.validate()?;
        let path = IdentityPath::operator(&issue.operator)?;
        tracing::info!(operator = %issue.operator, "issue operator");

        if let Some(stored) = self.read_record::<OperatorIssue>(&path)? {
            issue.status = stored.status;
        }
        self.write_record(&path, &issue)?;

        self.refresh_operator(&mut issue)?;
        self.resign_accounts(&issue)?;

        if issue.create_system_account {
            self.ensure_system_account(&issue)?;
        }

        self.notify_resolver(&issue);
        self.read_operator(&issue.operator)?
            .ok_or_else(|| IssuerError::IssueNotFound(issue.operator.clone()))
    }

    /// Ensure keys, rebuild the operator token and persist the status.
    pub(crate) fn refresh_operator(&self, issue: &mut OperatorIssue) -> Result<()> {
        let path = IdentityPath::operator(&issue.operator)?;
        let (key_pair, created) = self.keys.ensure(&path)?;
        if created {
            tracing::info!(operator = %issue.operator, "operator nkey assigned");
        }
        let signing_keys = self.keys.sync_signing(&path, &issue.signing_keys)?;

        let sys_path = IdentityPath::account(&issue.operator, &issue.system_account)?;
        let system_account = self.keys.public_key(&sys_path)?;

        let mut claims = issue.claims_template.clone();
        if claims.data.name.is_empty() {
            claims.data.name = issue.operator.clone();
        }
        claims.nats.signing_keys = signing_keys;
        claims.nats.system_account = system_account.unwrap_or_default();

        let signed = token::build(claims, &key_pair.public_key(), &key_pair, None, None)?;
        self.store_token(&path, signed.token)?;

        issue.status.operator = IssueStatus {
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

    /// Re-sign every account under the operator.
    fn resign_accounts(&self, operator: &OperatorIssue) -> Result<()> {
        let path = IdentityPath::operator(&operator.operator)?;
        for account in self.list_children(&path)? {
            let account_path = IdentityPath::account(&operator.operator, &account)?;
            let Some(mut issue) = self.read_record::<AccountIssue>(&account_path)? else {
                continue;
            };
            tracing::debug!(operator = %operator.operator, account = %account, "re-signing account");
            self.refresh_account(&mut issue)?;
        }
        Ok(())
    }

    /// Issue the system account and push user unless the account exists.
    fn ensure_system_account(&self, operator: &OperatorIssue) -> Result<()> {
        let sys_path = IdentityPath::account(&operator.operator, &operator.system_account)?;
        if self.read_record::<AccountIssue>(&sys_path)?.is_none() {
            tracing::info!(
                operator = %operator.operator,
                account = %operator.system_account,
                "creating system account"
            );
            self.issue_account(AccountIssue {
                operator: operator.operator.clone(),
                account: operator.system_account.clone(),
                ..Default::default()
            })?;
        }

        let push_path =
            IdentityPath::user(&operator.operator, &operator.system_account, DEFAULT_PUSH_USER)?;
        if self.read_record::<UserIssue>(&push_path)?.is_none() {
            self.issue_user(UserIssue {
                operator: operator.operator.clone(),
                account: operator.system_account.clone(),
                user: DEFAULT_PUSH_USER.to_string(),
                ..Default::default()
            })?;
        }
        Ok(())
    }

    pub fn read_operator(&self, operator: &str) -> Result<Option<OperatorIssue>> {
        self.read_record(&IdentityPath::operator(operator)?)
    }

    /// Names of all operators with issue records.
    pub fn list_operators(&self) -> Result<Vec<String>> {
        crate::storage::list_leaves(self.storage.as_ref(), "issue/operator/")
    }

    /// Delete an operator with all its accounts, users and keys.
    ///
    /// Deleting an absent operator is not an error.
    pub fn delete_operator(&self, operator: &str) -> Result<()> {
        let path = IdentityPath::operator(operator)?;
        tracing::info!(operator, "delete operator");

        for account in self.list_stored_children(&path)? {
            self.purge_account(&IdentityPath::account(operator, &account)?)?;
        }
        self.keys.delete_all_signing(&path)?;
        self.delete_token(&path)?;
        self.keys.delete(&path)?;
        self.delete_record(&path)
    }
}
