//! Request dispatch: `(operation, path)` pairs onto the engine.
//!
//! The [`Backend`] parses a logical path (see [`path`]), opens a tracing
//! span carrying the operator/account/user of the request and calls into
//! the engine through two capability traits: [`IssuerStore`] for the
//! administrative surface and [`CredentialReader`] for credential reads.

pub mod path;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value};

use crate::creds::UserCreds;
use crate::error::{IssuerError, Result};
use crate::issue::{AccountIssue, NatsIssuer, OperatorIssue, UserIssue};
use crate::paths::IdentityPath;
use crate::template::parse_parameters;

pub use path::{LogicalPath, Root, Target};

// ── Capability traits ─────────────────────────────────────────────────────────

/// Administrative operations on issue records, keys and tokens.
pub trait IssuerStore: Send + Sync {
    fn issue_operator(&self, issue: OperatorIssue) -> Result<OperatorIssue>;
    fn read_operator(&self, operator: &str) -> Result<Option<OperatorIssue>>;
    fn list_operators(&self) -> Result<Vec<String>>;
    fn delete_operator(&self, operator: &str) -> Result<()>;

    fn issue_account(&self, issue: AccountIssue) -> Result<AccountIssue>;
    fn read_account(&self, operator: &str, account: &str) -> Result<Option<AccountIssue>>;
    fn list_accounts(&self, operator: &str) -> Result<Vec<String>>;
    fn delete_account(&self, operator: &str, account: &str) -> Result<()>;

    fn issue_user(&self, issue: UserIssue) -> Result<UserIssue>;
    fn read_user(&self, operator: &str, account: &str, user: &str) -> Result<Option<UserIssue>>;
    fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>>;
    fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()>;

    /// Public key of an identity's nkey.
    fn read_nkey(&self, path: &IdentityPath) -> Result<Option<String>>;
    fn list_nkeys(&self, parent: Option<&IdentityPath>) -> Result<Vec<String>>;

    /// Stored token of an operator or account.
    fn read_jwt(&self, path: &IdentityPath) -> Result<Option<String>>;
    fn list_jwts(&self, parent: Option<&IdentityPath>) -> Result<Vec<String>>;
}

/// Read-only credential generation.
pub trait CredentialReader: Send + Sync {
    fn generate_user_creds(
        &self,
        operator: &str,
        account: &str,
        user: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<UserCreds>;

    fn list_user_creds(&self, operator: &str, account: &str) -> Result<Vec<String>>;
}

impl IssuerStore for NatsIssuer {
    fn issue_operator(&self, issue: OperatorIssue) -> Result<OperatorIssue> {
        NatsIssuer::issue_operator(self, issue)
    }

    fn read_operator(&self, operator: &str) -> Result<Option<OperatorIssue>> {
        NatsIssuer::read_operator(self, operator)
    }

    fn list_operators(&self) -> Result<Vec<String>> {
        NatsIssuer::list_operators(self)
    }

    fn delete_operator(&self, operator: &str) -> Result<()> {
        NatsIssuer::delete_operator(self, operator)
    }

    fn issue_account(&self, issue: AccountIssue) -> Result<AccountIssue> {
        NatsIssuer::issue_account(self, issue)
    }

    fn read_account(&self, operator: &str, account: &str) -> Result<Option<AccountIssue>> {
        NatsIssuer::read_account(self, operator, account)
    }

    fn list_accounts(&self, operator: &str) -> Result<Vec<String>> {
        NatsIssuer::list_accounts(self, operator)
    }

    fn delete_account(&self, operator: &str, account: &str) -> Result<()> {
        NatsIssuer::delete_account(self, operator, account)
    }

    fn issue_user(&self, issue: UserIssue) -> Result<UserIssue> {
        NatsIssuer::issue_user(self, issue)
    }

    fn read_user(&self, operator: &str, account: &str, user: &str) -> Result<Option<UserIssue>> {
        NatsIssuer::read_user(self, operator, account, user)
    }

    fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        NatsIssuer::list_users(self, operator, account)
    }

    fn delete_user(&self, operator: &str, account: &str, user: &str) -> Result<()> {
        NatsIssuer::delete_user(self, operator, account, user)
    }

    fn read_nkey(&self, path: &IdentityPath) -> Result<Option<String>> {
        self.keys().public_key(path)
    }

    fn list_nkeys(&self, parent: Option<&IdentityPath>) -> Result<Vec<String>> {
        NatsIssuer::list_nkeys(self, parent)
    }

    fn read_jwt(&self, path: &IdentityPath) -> Result<Option<String>> {
        NatsIssuer::read_jwt(self, path)
    }

    fn list_jwts(&self, parent: Option<&IdentityPath>) -> Result<Vec<String>> {
        NatsIssuer::list_jwts(self, parent)
    }
}

impl CredentialReader for NatsIssuer {
    fn generate_user_creds(
        &self,
        operator: &str,
        account: &str,
        user: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<UserCreds> {
        NatsIssuer::generate_user_creds(self, operator, account, user, parameters)
    }

    fn list_user_creds(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        NatsIssuer::list_user_creds(self, operator, account)
    }
}

// ── Requests and responses ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Read,
    Delete,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Read => "read",
            Self::Delete => "delete",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: Operation,
    pub path: String,
    /// Request body; `Null` when there is none.
    pub data: Value,
}

impl Request {
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Data(Value),
    List(Vec<String>),
    Empty,
}

impl Response {
    /// JSON rendering: lists become `{"keys": [...]}`, empty is `null`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Data(value) => value,
            Self::List(keys) => json!({ "keys": keys }),
            Self::Empty => Value::Null,
        }
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

/// Dispatches requests onto an engine.
pub struct Backend<E> {
    engine: E,
}

fn request_span(request: &Request, path: &LogicalPath) -> tracing::Span {
    let span = tracing::info_span!(
        "request",
        operation = %request.operation,
        root = path.root.as_str(),
        operator = tracing::field::Empty,
        account = tracing::field::Empty,
        user = tracing::field::Empty,
    );
    let identity = match &path.target {
        Target::Entity(p) | Target::Children(Some(p)) => Some(p),
        Target::Children(None) => None,
    };
    match identity {
        Some(IdentityPath::Operator { operator }) => {
            span.record("operator", operator.as_str());
        }
        Some(IdentityPath::Account { operator, account }) => {
            span.record("operator", operator.as_str());
            span.record("account", account.as_str());
        }
        Some(IdentityPath::User {
            operator,
            account,
            user,
        }) => {
            span.record("operator", operator.as_str());
            span.record("account", account.as_str());
            span.record("user", user.as_str());
        }
        None => {}
    }
    span
}

/// Decode the `parameters` field of a credentials read: a JSON object, or
/// a string in either form accepted by [`parse_parameters`].
fn request_parameters(data: &Value) -> Result<BTreeMap<String, String>> {
    match data.get("parameters") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::String(raw)) => parse_parameters(raw),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|e| IssuerError::Validation(format!("invalid parameters: {e}"))),
        Some(other) => Err(IssuerError::Validation(format!(
            "parameters must be a string or object, got {other}"
        ))),
    }
}

fn not_found(path: &LogicalPath) -> IssuerError {
    IssuerError::IssueNotFound(path.to_string())
}

impl<E: IssuerStore + CredentialReader> Backend<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Handle one request.
    pub fn handle(&self, request: Request) -> Result<Response> {
        let path = LogicalPath::parse(&request.path)?;
        let span = request_span(&request, &path);
        let _guard = span.enter();

        let result = self.dispatch(&request, &path);
        match &result {
            Ok(_) => tracing::debug!("request handled"),
            Err(e) => tracing::warn!(error = %e, kind = ?e.kind(), "request failed"),
        }
        result
    }

    fn unsupported(request: &Request) -> IssuerError {
        IssuerError::UnsupportedPath(format!("{} {}", request.operation, request.path))
    }

    fn dispatch(&self, request: &Request, path: &LogicalPath) -> Result<Response> {
        match (path.root, &path.target) {
            (Root::Issue, Target::Entity(identity)) => self.issue_entity(request, path, identity),
            (Root::Issue, Target::Children(parent)) => {
                self.list(request, || match parent {
                    None => self.engine.list_operators(),
                    Some(IdentityPath::Operator { operator }) => {
                        self.engine.list_accounts(operator)
                    }
                    Some(IdentityPath::Account { operator, account }) => {
                        self.engine.list_users(operator, account)
                    }
                    Some(IdentityPath::User { .. }) => Err(Self::unsupported(request)),
                })
            }
            (
                Root::Creds,
                Target::Entity(IdentityPath::User {
                    operator,
                    account,
                    user,
                }),
            ) => {
                if request.operation != Operation::Read {
                    return Err(Self::unsupported(request));
                }
                let parameters = request_parameters(&request.data)?;
                let creds =
                    self.engine
                        .generate_user_creds(operator, account, user, &parameters)?;
                Ok(Response::Data(creds.to_response()?))
            }
            (Root::Creds, Target::Children(Some(IdentityPath::Account { operator, account }))) => {
                self.list(request, || self.engine.list_user_creds(operator, account))
            }
            (Root::Nkey, Target::Entity(identity)) => {
                if request.operation != Operation::Read {
                    return Err(Self::unsupported(request));
                }
                let public_key = self
                    .engine
                    .read_nkey(identity)?
                    .ok_or_else(|| not_found(path))?;
                Ok(Response::Data(json!({ "publicKey": public_key })))
            }
            (Root::Nkey, Target::Children(parent)) => {
                self.list(request, || self.engine.list_nkeys(parent.as_ref()))
            }
            (Root::Jwt, Target::Entity(identity)) => {
                if request.operation != Operation::Read {
                    return Err(Self::unsupported(request));
                }
                let jwt = self
                    .engine
                    .read_jwt(identity)?
                    .ok_or_else(|| not_found(path))?;
                Ok(Response::Data(json!({ "jwt": jwt })))
            }
            (Root::Jwt, Target::Children(parent)) => {
                self.list(request, || self.engine.list_jwts(parent.as_ref()))
            }
            _ => Err(Self::unsupported(request)),
        }
    }

    fn list(
        &self,
        request: &Request,
        list: impl FnOnce() -> Result<Vec<String>>,
    ) -> Result<Response> {
        if request.operation != Operation::List {
            return Err(Self::unsupported(request));
        }
        list().map(Response::List)
    }

    fn issue_entity(
        &self,
        request: &Request,
        path: &LogicalPath,
        identity: &IdentityPath,
    ) -> Result<Response> {
        match (request.operation, identity) {
            (Operation::Create | Operation::Update, IdentityPath::Operator { operator }) => {
                let issue = OperatorIssue::from_request(operator, &request.data)?;
                Ok(Response::Data(self.engine.issue_operator(issue)?.to_response()?))
            }
            (Operation::Create | Operation::Update, IdentityPath::Account { operator, account }) => {
                let issue = AccountIssue::from_request(operator, account, &request.data)?;
                Ok(Response::Data(self.engine.issue_account(issue)?.to_response()?))
            }
            (
                Operation::Create | Operation::Update,
                IdentityPath::User {
                    operator,
                    account,
                    user,
                },
            ) => {
                let issue = UserIssue::from_request(operator, account, user, &request.data)?;
                Ok(Response::Data(self.engine.issue_user(issue)?.to_response()?))
            }

            (Operation::Read, IdentityPath::Operator { operator }) => self
                .engine
                .read_operator(operator)?
                .ok_or_else(|| not_found(path))?
                .to_response()
                .map(Response::Data),
            (Operation::Read, IdentityPath::Account { operator, account }) => self
                .engine
                .read_account(operator, account)?
                .ok_or_else(|| not_found(path))?
                .to_response()
                .map(Response::Data),
            (
                Operation::Read,
                IdentityPath::User {
                    operator,
                    account,
                    user,
                },
            ) => self
                .engine
                .read_user(operator, account, user)?
                .ok_or_else(|| not_found(path))?
                .to_response()
                .map(Response::Data),

            (Operation::Delete, IdentityPath::Operator { operator }) => {
                self.engine.delete_operator(operator)?;
                Ok(Response::Empty)
            }
            (Operation::Delete, IdentityPath::Account { operator, account }) => {
                self.engine.delete_account(operator, account)?;
                Ok(Response::Empty)
            }
            (
                Operation::Delete,
                IdentityPath::User {
                    operator,
                    account,
                    user,
                },
            ) => {
                self.engine.delete_user(operator, account, user)?;
                Ok(Response::Empty)
            }

            (Operation::List, _) => Err(Self::unsupported(request)),
        }
    }
}
