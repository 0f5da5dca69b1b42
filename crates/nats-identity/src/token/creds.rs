//! The user credentials bundle (`.creds` file) format.

use crate::crypto::nkey::{KeyRole, NKeyPair};
use crate::error::{IssuerError, Result};

const JWT_BEGIN: &str = "-----BEGIN NATS USER JWT-----";
const JWT_END: &str = "------END NATS USER JWT------";
const SEED_BEGIN: &str = "-----BEGIN USER NKEY SEED-----";
const SEED_END: &str = "------END USER NKEY SEED------";
const BANNER: &str = "************************* IMPORTANT *************************\n\
NKEY Seed printed below can be used to sign and prove identity.\n\
NKEYs are sensitive and should be treated as secrets.";
const TRAILER: &str = "*************************************************************";

/// Render a user token and seed as a credentials bundle.
///
/// # Errors
///
/// Returns `IssuerError::InvalidKey` if `seed` is not a user seed.
pub fn format_user_creds(jwt: &str, seed: &str) -> Result<String> {
    let key_pair = NKeyPair::from_seed(seed)?;
    if key_pair.role() != KeyRole::User {
        return Err(IssuerError::InvalidKey(format!(
            "credentials need a user seed, got {}",
            key_pair.role().as_str()
        )));
    }
    Ok(format!(
        "{JWT_BEGIN}\n{jwt}\n{JWT_END}\n\n{BANNER}\n\n{SEED_BEGIN}\n{seed}\n{SEED_END}\n\n{TRAILER}\n",
        jwt = jwt.trim(),
        seed = seed.trim(),
    ))
}

fn block<'a>(text: &'a str, begin: &str, end: &str) -> Option<&'a str> {
    let start = text.find(begin)? + begin.len();
    let len = text[start..].find(end)?;
    Some(text[start..start + len].trim())
}

/// Extract the token and seed from a credentials bundle.
pub fn parse_user_creds(text: &str) -> Result<(String, String)> {
    let jwt = block(text, JWT_BEGIN, JWT_END)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IssuerError::InvalidToken("credentials contain no user JWT".into()))?;
    let seed = block(text, SEED_BEGIN, SEED_END)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IssuerError::InvalidKey("credentials contain no user seed".into()))?;
    Ok((jwt.to_string(), seed.to_string()))
}
