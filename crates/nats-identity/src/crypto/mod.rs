//! Cryptographic primitives for nats-identity.
//!
//! This module provides:
//! - NATS nkey generation and seed/public-key encoding
//! - Ed25519 signing and verification over JWT segments
//! - Argon2id passphrase-based key derivation
//! - ChaCha20-Poly1305 authenticated encryption
//! - Cryptographically secure random number generation

pub mod encryption;
pub mod nkey;
pub mod random;
pub mod signing;

pub use nkey::{public_key_of, KeyRole, NKeyPair};
