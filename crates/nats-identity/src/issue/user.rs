//! User issue and delete. User tokens are generated on read, see
//! [`crate::creds`].

use std::collections::BTreeMap;

use crate::error::{IssuerError, Result};
use crate::paths::IdentityPath;
use crate::template;
use crate::time::now_unix;

use super::types::{AccountIssue, NkeyStatus, UserIssue, DEFAULT_PUSH_USER};
use super::NatsIssuer;

impl NatsIssuer {
    /// Create or update a user template.
    ///
    /// The account must already be issued. Only the nkey is derived here;
    /// no token is signed or stored.
    pub fn issue_user(&self, mut issue: UserIssue) -> Result<UserIssue> {
        issue.validate()?;
        let path = IdentityPath::user(&issue.operator, &issue.account, &issue.user)?;
        tracing::info!(
            operator = %issue.operator,
            account = %issue.account,
            user = %issue.user,
            "issue user template"
        );

        if self
            .read_record::<AccountIssue>(&IdentityPath::account(&issue.operator, &issue.account)?)?
            .is_none()
        {
            return Err(IssuerError::ParentNotFound(format!(
                "account {}/{}",
                issue.operator, issue.account
            )));
        }

        if issue.user == DEFAULT_PUSH_USER {
            // The push user's creds are generated without parameters.
            template::instantiate(&issue.claims_template, &BTreeMap::new())?;
        }

        if let Some(stored) = self.read_record::<UserIssue>(&path)? {
            issue.status = stored.status;
        }
        self.write_record(&path, &issue)?;

        let (_, created) = self.keys.ensure(&path)?;
        if created {
            tracing::info!(user = %path, "user nkey assigned");
        }
        issue.status.user = NkeyStatus { nkey: true };
        self.write_record(&path, &issue)?;

        if issue.user == DEFAULT_PUSH_USER {
            match self.read_operator(&issue.operator)? {
                None => {
                    tracing::warn!(
                        operator = %issue.operator,
                        account = %issue.account,
                        "cannot refresh resolvers: operator issue does not exist"
                    );
                }
                Some(operator) => self.notify_resolver(&operator),
            }
        }
        Ok(issue)
    }

    pub fn read_user(&self, operator: &str, account: &str, user: &str) -> Result<Option<UserIssue>> {
        self.read_record(&IdentityPath::user(operator, account, user)?)
    }

    /// Names of the user templates under `operator/account`.
    pub fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        self.list_children(&IdentityPath::account(operator, account)?)
    }

    /// Delete a user.
    ///
    /// The user's key is revoked in the account ledger and the account token
    /// re-signed before the key and template are removed. Deleting an absent
    /// user is not an error.
    pub fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()> {
        let path = IdentityPath::user(operator, account, user)?;
        if self.read_record::<UserIssue>(&path)?.is_none() {
            tracing::debug!(user = %path, "user does not exist, nothing to delete");
            return Ok(());
        }
        tracing::info!(operator, account, user, "delete user");

        let account_path = IdentityPath::account(operator, account)?;
        if let Some(mut account_issue) = self.read_record::<AccountIssue>(&account_path)? {
            if let Some(public_key) = self.keys.public_key(&path)? {
                self.revoke_in_account(&mut account_issue, &public_key, now_unix())?;
                tracing::info!(user = %path, public_key = %public_key, "user revoked");
                if let Some(op) = self.read_operator(operator)? {
                    self.notify_resolver(&op);
                }
            }
        }

        self.keys.delete(&path)?;
        self.delete_record(&path)
    }
}
