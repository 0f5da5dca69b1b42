//! Identity addressing and the storage keys derived from it.

use std::fmt;

use crate::crypto::nkey::KeyRole;
use crate::error::{IssuerError, Result};

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Check that `id` matches `\w([\w.-]*\w)?`.
pub fn validate_identifier(kind: &str, id: &str) -> Result<()> {
    let mut chars = id.chars();
    let valid = match (chars.next(), id.chars().last()) {
        (Some(first), Some(last)) => {
            is_word(first) && is_word(last) && id.chars().all(|c| is_word(c) || c == '.' || c == '-')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(IssuerError::Validation(format!("invalid {kind} identifier: {id:?}")))
    }
}

/// Position of an identity in the operator → account → user hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityPath {
    Operator {
        operator: String,
    },
    Account {
        operator: String,
        account: String,
    },
    User {
        operator: String,
        account: String,
        user: String,
    },
}

impl IdentityPath {
    pub fn operator(operator: &str) -> Result<Self> {
        validate_identifier("operator", operator)?;
        Ok(Self::Operator {
            operator: operator.to_string(),
        })
    }

    pub fn account(operator: &str, account: &str) -> Result<Self> {
        validate_identifier("operator", operator)?;
        validate_identifier("account", account)?;
        Ok(Self::Account {
            operator: operator.to_string(),
            account: account.to_string(),
        })
    }

    pub fn user(operator: &str, account: &str, user: &str) -> Result<Self> {
        validate_identifier("operator", operator)?;
        validate_identifier("account", account)?;
        validate_identifier("user", user)?;
        Ok(Self::User {
            operator: operator.to_string(),
            account: account.to_string(),
            user: user.to_string(),
        })
    }

    /// Key role of the identity at this path.
    pub fn role(&self) -> KeyRole {
        match self {
            Self::Operator { .. } => KeyRole::Operator,
            Self::Account { .. } => KeyRole::Account,
            Self::User { .. } => KeyRole::User,
        }
    }

    pub fn operator_name(&self) -> &str {
        match self {
            Self::Operator { operator }
            | Self::Account { operator, .. }
            | Self::User { operator, .. } => operator,
        }
    }

    /// The enclosing identity, if any.
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Operator { .. } => None,
            Self::Account { operator, .. } => Some(Self::Operator {
                operator: operator.clone(),
            }),
            Self::User {
                operator, account, ..
            } => Some(Self::Account {
                operator: operator.clone(),
                account: account.clone(),
            }),
        }
    }

    fn suffix(&self) -> String {
        match self {
            Self::Operator { operator } => format!("operator/{operator}"),
            Self::Account { operator, account } => {
                format!("operator/{operator}/account/{account}")
            }
            Self::User {
                operator,
                account,
                user,
            } => format!("operator/{operator}/account/{account}/user/{user}"),
        }
    }

    /// `issue/…` key of the identity's issue record.
    pub fn issue_key(&self) -> String {
        format!("issue/{}", self.suffix())
    }

    /// `nkey/…` key of the identity's seed.
    pub fn nkey_key(&self) -> String {
        format!("nkey/{}", self.suffix())
    }

    /// Prefix under which the identity's signing seeds live.
    pub fn signing_prefix(&self) -> String {
        format!("nkey/{}/signing/", self.suffix())
    }

    /// `jwt/…` key of the identity's token. Users have none.
    pub fn jwt_key(&self) -> Option<String> {
        match self {
            Self::User { .. } => None,
            _ => Some(format!("jwt/{}", self.suffix())),
        }
    }

    /// Prefix listing the identity's direct children in `root` (`issue`,
    /// `nkey` or `jwt`).
    pub fn children_prefix(&self, root: &str) -> Option<String> {
        match self {
            Self::Operator { .. } => Some(format!("{root}/{}/account/", self.suffix())),
            Self::Account { .. } => Some(format!("{root}/{}/user/", self.suffix())),
            Self::User { .. } => None,
        }
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator { operator } => write!(f, "{operator}"),
            Self::Account { operator, account } => write!(f, "{operator}/{account}"),
            Self::User {
                operator,
                account,
                user,
            } => write!(f, "{operator}/{account}/{user}"),
        }
    }
}
