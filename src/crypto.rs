//! Symmetric authenticated encryption for `TenantLLMBinding` API-key
//! ciphertext (spec.md §3, §4.1).
//!
//! No reference file in this codebase exercises `aes-gcm` (it is declared in
//! the workspace manifest but never used), so this module is written
//! directly against the crate's documented API rather than adapted from an
//! existing implementation.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key is not configured")]
    KeyMissing,
    #[error("encryption failed")]
    EncryptFailed,
    #[error("decryption failed")]
    DecryptFailed,
}

/// Derives a 256-bit key from the configured `EncryptionKey` secret via
/// SHA-256, so operators may supply a passphrase of any length.
fn derive_key(secret: &str) -> Key<Aes256Gcm> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    *Key::<Aes256Gcm>::from_slice(&digest)
}

/// Encrypts `plaintext` under `secret`, returning `(ciphertext, nonce)`.
pub fn encrypt(secret: &str, plaintext: &str) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let key = derive_key(secret);
    let cipher = Aes256Gcm::new(&key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    {
        use aes_gcm::aead::rand_core::RngCore;
        OsRng.fill_bytes(&mut nonce_bytes);
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptFailed)?;

    Ok((ciphertext, nonce_bytes.to_vec()))
}

/// Decrypts `ciphertext`/`nonce` produced by [`encrypt`] back to the
/// original plaintext.
pub fn decrypt(secret: &str, ciphertext: &[u8], nonce: &[u8]) -> Result<String, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::DecryptFailed);
    }
    let key = derive_key(secret);
    let cipher = Aes256Gcm::new(&key);
    let nonce = Nonce::from_slice(nonce);

    let mut plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptFailed)?;

    let result = String::from_utf8(plaintext.clone()).map_err(|_| CryptoError::DecryptFailed);
    plaintext.zeroize();
    result
}
