//! Operator claims.

use serde::{Deserialize, Serialize};

use super::common::{is_false, ClaimsData};
use super::{ClaimType, Claims, LIBRARY_VERSION};

/// The `nats` section of an operator token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operator {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signing_keys: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account_server_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operator_service_urls: Vec<String>,
    /// Public key of the system account.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system_account: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub assert_server_version: String,
    #[serde(skip_serializing_if = "is_false")]
    pub strict_signing_key_usage: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub claim_type: String,
    pub version: u8,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            signing_keys: Vec::new(),
            account_server_url: String::new(),
            operator_service_urls: Vec::new(),
            system_account: String::new(),
            assert_server_version: String::new(),
            strict_signing_key_usage: false,
            tags: Vec::new(),
            claim_type: ClaimType::Operator.as_str().to_string(),
            version: LIBRARY_VERSION,
        }
    }
}

/// Claims of a self-signed operator token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorClaims {
    #[serde(flatten)]
    pub data: ClaimsData,
    #[serde(default)]
    pub nats: Operator,
}

impl Claims for OperatorClaims {
    fn claim_type() -> ClaimType {
        ClaimType::Operator
    }

    fn data(&self) -> &ClaimsData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ClaimsData {
        &mut self.data
    }

    fn stamp(&mut self) {
        self.nats.claim_type = ClaimType::Operator.as_str().to_string();
        self.nats.version = LIBRARY_VERSION;
    }
}
