//! Revocation ledger kept in `AccountClaims.nats.revocations`.
//!
//! Entries map a user public key to a unix timestamp. A user token whose
//! `iat` is at or before that timestamp is revoked. Entries are only ever
//! added or moved forward, never removed.

use std::collections::BTreeMap;

use crate::claims::AccountClaims;

/// Revoke `user_public_key` as of `at`, keeping the later timestamp if the
/// key is already revoked.
pub fn revoke(mut claims: AccountClaims, user_public_key: &str, at: i64) -> AccountClaims {
    let entry = claims
        .nats
        .revocations
        .entry(user_public_key.to_string())
        .or_insert(at);
    *entry = (*entry).max(at);
    claims
}

/// Whether a token for `user_public_key` issued at `issued_at` is revoked.
pub fn is_revoked(claims: &AccountClaims, user_public_key: &str, issued_at: i64) -> bool {
    claims
        .nats
        .revocations
        .get(user_public_key)
        .is_some_and(|revoked_at| issued_at <= *revoked_at)
}

/// Fold `incoming` into `stored`, keeping the later timestamp per key.
pub fn merge(stored: &mut BTreeMap<String, i64>, incoming: &BTreeMap<String, i64>) {
    for (key, at) in incoming {
        let entry = stored.entry(key.clone()).or_insert(*at);
        *entry = (*entry).max(*at);
    }
}
