//! nats-identity: operator, account and user identities for NATS.
//!
//! Issues nkeys and signed JWTs for the operator → account → user
//! hierarchy, keeps revocation ledgers on account tokens, and generates
//! user credentials on demand from parameterized claim templates.

pub mod backend;
pub mod claims;
pub mod creds;
pub mod crypto;
pub mod error;
pub mod issue;
pub mod keys;
pub mod ledger;
pub mod paths;
pub mod resolver;
pub mod storage;
pub mod template;
pub mod time;
pub mod token;

// Re-export primary types
pub use error::{ErrorKind, IssuerError, Result};
pub use issue::{
    AccountIssue, NatsIssuer, OperatorIssue, UserIssue, DEFAULT_PUSH_USER, DEFAULT_SYS_ACCOUNT,
};
pub use paths::IdentityPath;

// Re-export routing types
pub use backend::{Backend, CredentialReader, IssuerStore, Operation, Request, Response};

// Re-export claim and token types
pub use claims::{AccountClaims, Claims, OperatorClaims, UserClaims};
pub use creds::UserCreds;
pub use crypto::{KeyRole, NKeyPair};

// Re-export storage and resolver types
pub use resolver::{AccountResolver, AccountResolverUpdate, NoopResolver, RecordingResolver};
pub use storage::{DirectoryStorage, MemoryStorage, SealedStorage, Storage};
