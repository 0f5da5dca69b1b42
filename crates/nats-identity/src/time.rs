//! Time utilities for nats-identity.
//!
//! Token and revocation timestamps are Unix epoch seconds (i64), the
//! resolution NATS JWTs use.

/// Return the current time as seconds since Unix epoch.
pub fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
