//! In-process [`EncryptionService`] backed by AES-256-GCM-SIV.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant,
//! which is what makes [`NonceMode::Deterministic`] safe: a repeated nonce only
//! reveals that two plaintexts were equal.
//!
//! # Ciphertext format
//!
//! ```text
//! nonce (12 bytes) || ciphertext + tag (16 bytes)
//! ```
//!
//! The key id is bound as associated data, so a ciphertext opened under a
//! different key id fails authentication even if the key bytes were shared.

use std::collections::HashMap;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::{EncryptionError, EncryptionService, KeyId};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM-SIV authentication tag.
pub const TAG_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while loading key material.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// The key material has an unexpected length.
    #[error("key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-size buffer holding exactly [`KEY_LEN`] bytes of key material.
///
/// Zeroed on drop; never printed.
pub struct KeyMaterial(Box<[u8; KEY_LEN]>);

impl KeyMaterial {
    /// Copy key bytes into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError::InvalidLength`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyringError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyringError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Generate fresh key material from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(buf)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// How nonces are chosen for each encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonceMode {
    /// A fresh random nonce per call; equal plaintexts give different tokens.
    #[default]
    Random,
    /// Nonce = HMAC-SHA256(key, key id || plaintext) truncated to
    /// [`NONCE_LEN`]; equal plaintexts give equal tokens.
    Deterministic,
}

/// A set of named AES-256-GCM-SIV keys.
#[derive(Debug, Default)]
pub struct AeadKeyring {
    keys: HashMap<KeyId, KeyMaterial>,
    nonce_mode: NonceMode,
}

impl AeadKeyring {
    /// An empty keyring using random nonces.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty keyring using the given nonce mode.
    pub fn with_nonce_mode(nonce_mode: NonceMode) -> Self {
        Self {
            keys: HashMap::new(),
            nonce_mode,
        }
    }

    /// Add (or replace) the key stored under `key_id`.
    pub fn with_key(mut self, key_id: KeyId, key: KeyMaterial) -> Self {
        self.insert(key_id, key);
        self
    }

    /// Add (or replace) the key stored under `key_id`, returning the old one.
    pub fn insert(&mut self, key_id: KeyId, key: KeyMaterial) -> Option<KeyMaterial> {
        self.keys.insert(key_id, key)
    }

    /// Returns `true` if a key is stored under `key_id`.
    pub fn contains(&self, key_id: &KeyId) -> bool {
        self.keys.contains_key(key_id)
    }

    fn cipher(&self, key_id: &KeyId) -> Result<(&KeyMaterial, Aes256GcmSiv), EncryptionError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| EncryptionError::UnknownKey(key_id.to_string()))?;
        let cipher = Aes256GcmSiv::new_from_slice(key.as_bytes())
            .map_err(|_| EncryptionError::Service("invalid key length".into()))?;
        Ok((key, cipher))
    }

    fn nonce(
        &self,
        key: &KeyMaterial,
        key_id: &KeyId,
        plaintext: &[u8],
    ) -> Result<[u8; NONCE_LEN], EncryptionError> {
        let mut nonce = [0u8; NONCE_LEN];
        match self.nonce_mode {
            NonceMode::Random => OsRng.fill_bytes(&mut nonce),
            NonceMode::Deterministic => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
                    .map_err(|_| EncryptionError::Service("invalid key length".into()))?;
                mac.update(key_id.as_str().as_bytes());
                mac.update(&[0]);
                mac.update(plaintext);
                let digest = mac.finalize().into_bytes();
                nonce.copy_from_slice(&digest[..NONCE_LEN]);
            }
        }
        Ok(nonce)
    }

    fn seal(&self, key_id: &KeyId, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let (key, cipher) = self.cipher(key_id)?;
        let nonce_bytes = self.nonce(key, key_id, plaintext)?;
        let payload = Payload {
            msg: plaintext,
            aad: key_id.as_str().as_bytes(),
        };
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), payload)
            .map_err(|_| EncryptionError::Service("aead operation failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, key_id: &KeyId, sealed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let (_, cipher) = self.cipher(key_id)?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::Rejected("ciphertext too short".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let payload = Payload {
            msg: ciphertext,
            aad: key_id.as_str().as_bytes(),
        };
        cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|_| EncryptionError::Rejected("authentication failed".into()))
    }
}

impl EncryptionService for AeadKeyring {
    async fn encrypt(&self, key_id: &KeyId, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.seal(key_id, plaintext)
    }

    async fn decrypt(&self, key_id: &KeyId, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.open(key_id, ciphertext)
    }
}
