//! NATS nkeys: Ed25519 key pairs in the platform's text encoding.
//!
//! Encoding, checksums and signatures come from the `nkeys` crate. This
//! module narrows it to the three roles of the issuing hierarchy: public
//! keys start with `O`, `A` or `U` and seeds with `SO`, `SA` or `SU`.
//!
//! Only the seed is ever persisted. The public key is always derived.

use nkeys::KeyPair;

use crate::error::{IssuerError, Result};

/// Which level of the hierarchy a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Operator,
    Account,
    User,
}

impl KeyRole {
    /// Role named by the first character of an encoded public key.
    fn from_public_key(public_key: &str) -> Result<Self> {
        match public_key.chars().next() {
            Some('O') => Ok(Self::Operator),
            Some('A') => Ok(Self::Account),
            Some('U') => Ok(Self::User),
            _ => Err(IssuerError::InvalidKey(format!(
                "not an operator, account or user key: {public_key}"
            ))),
        }
    }

    /// Return a stable string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Operator => "operator",
            Self::Account => "account",
            Self::User => "user",
        }
    }
}

fn invalid_key(e: nkeys::error::Error) -> IssuerError {
    IssuerError::InvalidKey(e.to_string())
}

/// Decode an encoded public key into its role and a verify-only key pair.
pub fn decode_public_key(public_key: &str) -> Result<(KeyRole, KeyPair)> {
    let role = KeyRole::from_public_key(public_key)?;
    let key = KeyPair::from_public_key(public_key).map_err(invalid_key)?;
    Ok((role, key))
}

/// An Ed25519 key pair tagged with its hierarchy role.
pub struct NKeyPair {
    role: KeyRole,
    inner: KeyPair,
}

impl NKeyPair {
    /// Generate a new random key pair for the given role.
    pub fn generate(role: KeyRole) -> Self {
        let inner = match role {
            KeyRole::Operator => KeyPair::new_operator(),
            KeyRole::Account => KeyPair::new_account(),
            KeyRole::User => KeyPair::new_user(),
        };
        Self { role, inner }
    }

    /// Reconstruct a key pair from an encoded seed (`S…`).
    pub fn from_seed(seed: &str) -> Result<Self> {
        let inner = KeyPair::from_seed(seed.trim()).map_err(invalid_key)?;
        let role = KeyRole::from_public_key(&inner.public_key())?;
        Ok(Self { role, inner })
    }

    /// Return the role of this key pair.
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Return the encoded seed. Treat the result as a secret.
    pub fn seed(&self) -> Result<String> {
        self.inner.seed().map_err(invalid_key)
    }

    /// Return the encoded public key (`O…`, `A…`, `U…`).
    pub fn public_key(&self) -> String {
        self.inner.public_key()
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.inner.sign(message).map_err(invalid_key)
    }

    /// Verify a signature made by this key pair.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        self.inner
            .verify(message, signature)
            .map_err(|_| IssuerError::SignatureInvalid)
    }
}

impl std::fmt::Debug for NKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NKeyPair")
            .field("role", &self.role)
            .field("public_key", &self.public_key())
            .finish()
    }
}

/// Derive the encoded public key from an encoded seed.
pub fn public_key_of(seed: &str) -> Result<String> {
    Ok(NKeyPair::from_seed(seed)?.public_key())
}
