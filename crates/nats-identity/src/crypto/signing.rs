//! Ed25519 signing and verification over JWT segments.
//!
//! Signatures travel as URL-safe base64 without padding, which is what the
//! third segment of a NATS JWT carries.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nkeys::KeyPair;

use crate::crypto::nkey::NKeyPair;
use crate::error::{IssuerError, Result};

/// Sign a message and return the signature as base64url.
pub fn sign_to_base64url(key_pair: &NKeyPair, message: &[u8]) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(key_pair.sign(message)?))
}

/// Verify a base64url-encoded signature against a public key.
pub fn verify_from_base64url(public_key: &KeyPair, message: &[u8], signature_b64: &str) -> Result<()> {
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| IssuerError::InvalidToken(format!("invalid base64url signature: {e}")))?;
    if signature.len() != 64 {
        return Err(IssuerError::InvalidToken("signature must be 64 bytes".into()));
    }
    public_key
        .verify(message, &signature)
        .map_err(|_| IssuerError::SignatureInvalid)
}
