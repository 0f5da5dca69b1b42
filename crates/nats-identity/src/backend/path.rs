//! Logical request paths.
//!
//! ```text
//! {root}/operator/                                   children of the root
//! {root}/operator/{op}                               operator
//! {root}/operator/{op}/account/                      accounts of op
//! {root}/operator/{op}/account/{acc}                 account
//! {root}/operator/{op}/account/{acc}/user/           users of acc
//! {root}/operator/{op}/account/{acc}/user/{user}     user
//! ```
//!
//! `root` is one of `issue`, `creds`, `nkey`, `jwt`. A trailing `/` on a
//! children path is optional.

use std::fmt;

use crate::error::{IssuerError, Result};
use crate::paths::IdentityPath;

/// First path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Issue,
    Creds,
    Nkey,
    Jwt,
}

impl Root {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "issue" => Some(Self::Issue),
            "creds" => Some(Self::Creds),
            "nkey" => Some(Self::Nkey),
            "jwt" => Some(Self::Jwt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Issue => "issue",
            Self::Creds => "creds",
            Self::Nkey => "nkey",
            Self::Jwt => "jwt",
        }
    }
}

/// What a path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single identity.
    Entity(IdentityPath),
    /// The children of an identity, or all operators when `None`.
    Children(Option<IdentityPath>),
}

/// A parsed logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    pub root: Root,
    pub target: Target,
}

impl LogicalPath {
    /// Parse `path`.
    ///
    /// # Errors
    ///
    /// `UnsupportedPath` for anything outside the grammar above, including
    /// user tokens (`jwt/…/user/…`), which are never stored.
    /// `Validation` for an identifier that is not `\w([\w.-]*\w)?`.
    pub fn parse(path: &str) -> Result<Self> {
        let unsupported = || IssuerError::UnsupportedPath(path.to_string());

        let trimmed = path.trim_start_matches('/');
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let segments: Vec<&str> = trimmed.split('/').collect();
        let (first, rest) = segments.split_first().ok_or_else(unsupported)?;
        let root = Root::parse(first).ok_or_else(unsupported)?;

        let target = match rest {
            ["operator"] => Target::Children(None),
            ["operator", op] => Target::Entity(IdentityPath::operator(op)?),
            ["operator", op, "account"] => Target::Children(Some(IdentityPath::operator(op)?)),
            ["operator", op, "account", acc] => Target::Entity(IdentityPath::account(op, acc)?),
            ["operator", op, "account", acc, "user"] => {
                Target::Children(Some(IdentityPath::account(op, acc)?))
            }
            ["operator", op, "account", acc, "user", user] => {
                Target::Entity(IdentityPath::user(op, acc, user)?)
            }
            _ => return Err(unsupported()),
        };

        let supported = match (root, &target) {
            (Root::Jwt, Target::Entity(IdentityPath::User { .. }))
            | (Root::Jwt, Target::Children(Some(IdentityPath::Account { .. }))) => false,
            (Root::Creds, Target::Entity(IdentityPath::User { .. }))
            | (Root::Creds, Target::Children(Some(IdentityPath::Account { .. }))) => true,
            (Root::Creds, _) => false,
            _ => true,
        };
        if !supported {
            return Err(unsupported());
        }

        Ok(Self { root, target })
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Entity(p) => write!(f, "{}:{p}", self.root.as_str()),
            Target::Children(Some(p)) => write!(f, "{}:{p}/", self.root.as_str()),
            Target::Children(None) => write!(f, "{}:/", self.root.as_str()),
        }
    }
}
