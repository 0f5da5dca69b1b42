//! Claim types carried by NATS JWTs.
//!
//! Each token has the registered JWT fields ([`ClaimsData`]) at the top
//! level and a role-specific `nats` section:
//!
//! - [`OperatorClaims`]: self-signed, lists operator signing keys and the
//!   system account.
//! - [`AccountClaims`]: signed by the operator, carries limits, account
//!   signing keys and the revocation ledger.
//! - [`UserClaims`]: signed by the account, carries permissions and limits.

pub mod account;
pub mod common;
pub mod operator;
pub mod user;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use account::{Account, AccountClaims, Export, ExportType, Import, OperatorLimits};
pub use common::{
    ClaimsData, NatsLimits, Permission, Permissions, ResponsePermission, TimeRange,
    LIBRARY_VERSION, NO_LIMIT,
};
pub use operator::{Operator, OperatorClaims};
pub use user::{User, UserClaims};

/// The `nats.type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimType {
    Operator,
    Account,
    User,
}

impl ClaimType {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Operator => "operator",
            Self::Account => "account",
            Self::User => "user",
        }
    }
}

/// Common access to the claim types a token can carry.
pub trait Claims: Serialize + DeserializeOwned + Clone {
    /// Which kind of token these claims describe.
    fn claim_type() -> ClaimType;

    fn data(&self) -> &ClaimsData;

    fn data_mut(&mut self) -> &mut ClaimsData;

    /// Reset `nats.type` and `nats.version` to the values for this type.
    fn stamp(&mut self);

    /// Record the owning account when a delegated key signs. Only user
    /// tokens carry this field.
    fn set_issuer_account(&mut self, _account_public_key: Option<&str>) {}
}
