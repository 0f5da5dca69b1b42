//! NATS JWT assembly, signing and verification.
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)`
//! with the Ed25519 signature taken over the first two segments joined by a
//! dot. The `jti` is the base32 SHA-256 of the claims rendered with an
//! empty `jti`, so it doubles as a content hash.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::claims::{ClaimType, Claims};
use crate::crypto::nkey::{decode_public_key, KeyRole, NKeyPair};
use crate::crypto::signing::{sign_to_base64url, verify_from_base64url};
use crate::error::{IssuerError, Result};
use crate::time::now_unix;

/// Header `typ` of every token.
pub const TOKEN_TYPE: &str = "JWT";
/// Header `alg` of every token.
pub const ALGORITHM: &str = "ed25519-nkey";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    typ: String,
    alg: String,
}

impl Header {
    fn new() -> Self {
        Self {
            typ: TOKEN_TYPE.to_string(),
            alg: ALGORITHM.to_string(),
        }
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// The encoded JWT.
    pub token: String,
    /// Unix seconds at which the token expires, if it does.
    pub expires_at: Option<i64>,
}

/// Role of the key that may sign a given claim type.
fn issuer_role(claim_type: ClaimType) -> KeyRole {
    match claim_type {
        ClaimType::Operator | ClaimType::Account => KeyRole::Operator,
        ClaimType::User => KeyRole::Account,
    }
}

fn hash_id<C: Claims>(claims: &C) -> Result<String> {
    let bytes = serde_json::to_vec(claims)
        .map_err(|e| IssuerError::SerializationError(format!("could not encode claims: {e}")))?;
    Ok(BASE32_NOPAD.encode(&Sha256::digest(&bytes)))
}

/// Stamp, hash and sign `claims`.
///
/// `subject` becomes `sub` and the issuer's public key becomes `iss`.
/// `iat` is set to now and, when `expiration_s` is positive, `exp` to
/// `iat + expiration_s`. Any other `exp` in `claims` is cleared.
/// `issuer_account` is recorded on user tokens signed by a delegated key.
///
/// # Errors
///
/// Returns `IssuerError::InvalidKey` if the issuer's role cannot sign this
/// kind of token, and `IssuerError::Validation` if the expiry overflows.
pub fn build<C: Claims>(
    mut claims: C,
    subject: &str,
    issuer: &NKeyPair,
    issuer_account: Option<&str>,
    expiration_s: Option<i64>,
) -> Result<SignedToken> {
    let expected = issuer_role(C::claim_type());
    if issuer.role() != expected {
        return Err(IssuerError::InvalidKey(format!(
            "{} tokens must be signed by an {} key, got {}",
            C::claim_type().as_str(),
            expected.as_str(),
            issuer.role().as_str()
        )));
    }

    let now = now_unix();
    claims.stamp();
    claims.set_issuer_account(issuer_account);
    {
        let data = claims.data_mut();
        data.sub = subject.to_string();
        data.iss = issuer.public_key();
        data.iat = now;
        data.exp = match expiration_s.filter(|s| *s > 0) {
            Some(secs) => now.checked_add(secs).ok_or_else(|| {
                IssuerError::Validation(format!("expiration of {secs}s is out of range"))
            })?,
            None => 0,
        };
        data.jti = String::new();
    }
    let jti = hash_id(&claims)?;
    claims.data_mut().jti = jti;

    let header = serde_json::to_vec(&Header::new())
        .map_err(|e| IssuerError::SerializationError(e.to_string()))?;
    let payload = serde_json::to_vec(&claims)
        .map_err(|e| IssuerError::SerializationError(e.to_string()))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let signature = sign_to_base64url(issuer, signing_input.as_bytes())?;

    let exp = claims.data().exp;
    Ok(SignedToken {
        token: format!("{signing_input}.{signature}"),
        expires_at: (exp > 0).then_some(exp),
    })
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| IssuerError::InvalidToken(format!("invalid {what} encoding: {e}")))
}

/// Decode a token and verify its signature against the `iss` nkey.
///
/// Also checks the header, the `nats.type` against `C`, and that the issuer
/// key has the role allowed to sign `C`. Expiry is not enforced.
pub fn decode<C: Claims>(token: &str) -> Result<C> {
    let mut parts = token.trim().split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(IssuerError::InvalidToken("expected three segments".into()));
    };

    let header: Header = serde_json::from_slice(&decode_segment(header_b64, "header")?)
        .map_err(|e| IssuerError::InvalidToken(format!("invalid header: {e}")))?;
    if header.typ != TOKEN_TYPE || header.alg != ALGORITHM {
        return Err(IssuerError::InvalidToken(format!(
            "unsupported header typ={} alg={}",
            header.typ, header.alg
        )));
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&decode_segment(payload_b64, "payload")?)
            .map_err(|e| IssuerError::InvalidToken(format!("invalid payload: {e}")))?;
    let claim_type = payload
        .pointer("/nats/type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if claim_type != C::claim_type().as_str() {
        return Err(IssuerError::InvalidToken(format!(
            "expected {} token, got {claim_type:?}",
            C::claim_type().as_str()
        )));
    }
    let claims: C = serde_json::from_value(payload)
        .map_err(|e| IssuerError::InvalidToken(format!("invalid claims: {e}")))?;

    let (role, public_key) = decode_public_key(&claims.data().iss)?;
    if role != issuer_role(C::claim_type()) {
        return Err(IssuerError::InvalidToken(format!(
            "issuer has role {}",
            role.as_str()
        )));
    }
    let signing_input = format!("{header_b64}.{payload_b64}");
    verify_from_base64url(&public_key, signing_input.as_bytes(), signature_b64)?;

    Ok(claims)
}
