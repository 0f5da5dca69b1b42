//! User claims.

use serde::{Deserialize, Serialize};

use super::common::{is_false, ClaimsData, NatsLimits, Permission, ResponsePermission, TimeRange};
use super::{ClaimType, Claims, LIBRARY_VERSION};

/// The `nats` section of a user token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "pub", skip_serializing_if = "Permission::is_empty")]
    pub publish: Permission,
    #[serde(rename = "sub", skip_serializing_if = "Permission::is_empty")]
    pub subscribe: Permission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp: Option<ResponsePermission>,
    /// Allowed source networks (CIDR).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub src: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub times: Vec<TimeRange>,
    #[serde(rename = "times_location", skip_serializing_if = "String::is_empty")]
    pub locale: String,
    #[serde(flatten)]
    pub limits: NatsLimits,
    #[serde(skip_serializing_if = "is_false")]
    pub bearer_token: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_connection_types: Vec<String>,
    /// Public key of the account when the token is signed by one of its
    /// signing keys.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issuer_account: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub claim_type: String,
    pub version: u8,
}

impl Default for User {
    fn default() -> Self {
        Self {
            publish: Permission::default(),
            subscribe: Permission::default(),
            resp: None,
            src: Vec::new(),
            times: Vec::new(),
            locale: String::new(),
            limits: NatsLimits::default(),
            bearer_token: false,
            allowed_connection_types: Vec::new(),
            issuer_account: String::new(),
            tags: Vec::new(),
            claim_type: ClaimType::User.as_str().to_string(),
            version: LIBRARY_VERSION,
        }
    }
}

/// Claims of a user token. Templates for these may carry `{{name}}`
/// placeholders anywhere in their string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(flatten)]
    pub data: ClaimsData,
    #[serde(default)]
    pub nats: User,
}

impl Claims for UserClaims {
    fn claim_type() -> ClaimType {
        ClaimType::User
    }

    fn data(&self) -> &ClaimsData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ClaimsData {
        &mut self.data
    }

    fn stamp(&mut self) {
        self.nats.claim_type = ClaimType::User.as_str().to_string();
        self.nats.version = LIBRARY_VERSION;
    }

    fn set_issuer_account(&mut self, account_public_key: Option<&str>) {
        self.nats.issuer_account = account_public_key.unwrap_or_default().to_string();
    }
}
