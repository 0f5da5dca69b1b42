//! Sealed storage: values encrypted at rest under a passphrase.
//!
//! Wraps any [`Storage`] and encrypts every value with ChaCha20-Poly1305
//! under a key derived once from the passphrase via Argon2id. Keys (paths)
//! stay in the clear so that listing works unchanged.
//!
//! The salt and a check value live at the reserved key `core/seal`:
//!
//! ```json
//! {
//!     "version": 1,
//!     "kdf": "argon2id",
//!     "algorithm": "chacha20-poly1305",
//!     "salt": "<base64-16-bytes>",
//!     "check": { "nonce": "<base64>", "ciphertext": "<base64>" }
//! }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::Storage;
use crate::crypto::encryption::SealKey;
use crate::crypto::random::random_salt_16;
use crate::error::{IssuerError, Result};

const SEAL_KEY: &str = "core/seal";
const SEAL_VERSION: u32 = 1;
const SEAL_KDF: &str = "argon2id";
const SEAL_ALGORITHM: &str = "chacha20-poly1305";
const SEAL_CHECK_PLAINTEXT: &[u8] = b"nats-identity-seal-check";

#[derive(Debug, Serialize, Deserialize)]
struct SealMetadata {
    version: u32,
    kdf: String,
    algorithm: String,
    salt: String,
    check: SealedValue,
}

#[derive(Debug, Serialize, Deserialize)]
struct SealedValue {
    nonce: String,
    ciphertext: String,
}

/// Storage wrapper that encrypts values under a passphrase-derived key.
pub struct SealedStorage<S: Storage> {
    inner: S,
    key: SealKey,
}

impl<S: Storage> SealedStorage<S> {
    /// Open (or initialise) a sealed view over `inner`.
    ///
    /// The first open writes the seal metadata. Later opens verify the
    /// passphrase against the stored check value.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::InvalidPassphrase` if the passphrase does not
    /// match the one the store was sealed with.
    pub fn open(inner: S, passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(IssuerError::Validation("passphrase cannot be empty".into()));
        }

        match inner.get(SEAL_KEY)? {
            Some(bytes) => {
                let meta: SealMetadata = serde_json::from_slice(&bytes).map_err(|e| {
                    IssuerError::SerializationError(format!("invalid seal metadata: {e}"))
                })?;
                if meta.version != SEAL_VERSION
                    || meta.kdf != SEAL_KDF
                    || meta.algorithm != SEAL_ALGORITHM
                {
                    return Err(IssuerError::StorageError(format!(
                        "unsupported seal version={} kdf={} algorithm={}",
                        meta.version, meta.kdf, meta.algorithm
                    )));
                }
                let salt: [u8; 16] = decode_b64(&meta.salt)?
                    .try_into()
                    .map_err(|_| IssuerError::StorageError("salt must be 16 bytes".into()))?;
                let key = SealKey::derive(passphrase, &salt)?;
                let check = open_value(&key, &meta.check)?;
                if check != SEAL_CHECK_PLAINTEXT {
                    return Err(IssuerError::InvalidPassphrase);
                }
                Ok(Self { inner, key })
            }
            None => {
                let salt = random_salt_16();
                let key = SealKey::derive(passphrase, &salt)?;
                let meta = SealMetadata {
                    version: SEAL_VERSION,
                    kdf: SEAL_KDF.to_string(),
                    algorithm: SEAL_ALGORITHM.to_string(),
                    salt: STANDARD.encode(salt),
                    check: seal_value(&key, SEAL_CHECK_PLAINTEXT)?,
                };
                let json = serde_json::to_vec(&meta)
                    .map_err(|e| IssuerError::SerializationError(e.to_string()))?;
                inner.put(SEAL_KEY, &json)?;
                Ok(Self { inner, key })
            }
        }
    }

    /// Borrow the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn decode_b64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| IssuerError::StorageError(format!("invalid base64 in sealed value: {e}")))
}

fn seal_value(key: &SealKey, plaintext: &[u8]) -> Result<SealedValue> {
    let (nonce, ciphertext) = key.seal(plaintext)?;
    Ok(SealedValue {
        nonce: STANDARD.encode(nonce),
        ciphertext: STANDARD.encode(ciphertext),
    })
}

fn open_value(key: &SealKey, sealed: &SealedValue) -> Result<Vec<u8>> {
    let nonce = decode_b64(&sealed.nonce)?;
    let ciphertext = decode_b64(&sealed.ciphertext)?;
    key.open(&nonce, &ciphertext)
}

impl<S: Storage> Storage for SealedStorage<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(bytes) = self.inner.get(key)? else {
            return Ok(None);
        };
        let sealed: SealedValue = serde_json::from_slice(&bytes).map_err(|e| {
            IssuerError::SerializationError(format!("invalid sealed value at {key}: {e}"))
        })?;
        open_value(&self.key, &sealed).map(Some)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        if key == SEAL_KEY {
            return Err(IssuerError::Validation(format!("{SEAL_KEY} is reserved")));
        }
        let sealed = seal_value(&self.key, value)?;
        let json = serde_json::to_vec(&sealed)
            .map_err(|e| IssuerError::SerializationError(e.to_string()))?;
        self.inner.put(key, &json)
    }

    fn delete(&self, key: &str) -> Result<()> {
        if key == SEAL_KEY {
            return Err(IssuerError::Validation(format!("{SEAL_KEY} is reserved")));
        }
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix)
    }
}
