//! The seal: a passphrase-derived key that encrypts stored values.
//!
//! The key is Argon2id over the passphrase and the store's 16-byte salt.
//! Each value is sealed with ChaCha20-Poly1305 under a fresh 12-byte nonce,
//! so a sealed value is the pair `(nonce, ciphertext || tag)`.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::Zeroizing;

use crate::crypto::random::random_nonce_12;
use crate::error::{IssuerError, Result};

/// Argon2id memory cost in KiB.
const KDF_MEMORY_KIB: u32 = 19 * 1024;
const KDF_ITERATIONS: u32 = 2;
const KDF_LANES: u32 = 1;

/// Length of the nonce stored beside every sealed value.
pub const NONCE_LEN: usize = 12;

/// Symmetric key for sealing stored values.
pub struct SealKey {
    cipher: ChaCha20Poly1305,
}

impl SealKey {
    /// Derive the seal key for `passphrase` under a store's `salt`.
    pub fn derive(passphrase: &str, salt: &[u8; 16]) -> Result<Self> {
        let params = Params::new(KDF_MEMORY_KIB, KDF_ITERATIONS, KDF_LANES, Some(32))
            .map_err(|e| IssuerError::EncryptionFailed(format!("argon2 params: {e}")))?;
        let mut key = Zeroizing::new([0u8; 32]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
            .map_err(|e| IssuerError::EncryptionFailed(format!("argon2: {e}")))?;
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key[..])),
        })
    }

    /// Seal `plaintext` under a fresh nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
        let nonce = random_nonce_12();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| IssuerError::EncryptionFailed(format!("seal: {e}")))?;
        Ok((nonce, ciphertext))
    }

    /// Open a sealed value.
    ///
    /// A failed tag check is reported as `InvalidPassphrase`.
    pub fn open(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if nonce.len() != NONCE_LEN {
            return Err(IssuerError::StorageError(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            )));
        }
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| IssuerError::InvalidPassphrase)
    }
}
