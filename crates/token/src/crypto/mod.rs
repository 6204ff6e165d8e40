//! The encryption-service boundary used by the confidentiality stage.
//!
//! The pipeline never touches key material itself. It hands plaintext bytes
//! and an opaque [`KeyId`] to an [`EncryptionService`] and gets ciphertext
//! back. Two implementations ship with the crate:
//!
//! - [`crate::aws::KmsEncryptionService`]: AWS KMS, for production.
//! - [`keyring::AeadKeyring`]: in-process AES-256-GCM-SIV keys, for tests,
//!   local development, and deployments without KMS.

pub mod keyring;

pub use keyring::{AeadKeyring, KeyMaterial, KeyringError, NonceMode};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by an [`EncryptionService`].
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The service refused the ciphertext: authentication failed, the key
    /// does not match, or the bytes are corrupt.
    #[error("ciphertext rejected: {0}")]
    Rejected(String),

    /// The key identifier is not known to the service.
    #[error("unknown key id: {0}")]
    UnknownKey(String),

    /// A key identifier was empty or whitespace-only.
    #[error("key id must not be blank")]
    BlankKeyId,

    /// Any other failure of the service (network, throttling, disabled key).
    #[error("encryption service failure: {0}")]
    Service(String),
}

/// Opaque identifier of the key the service should use.
///
/// Fixed per pipeline; never read back out of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    /// Wrap a key identifier (KMS key id, ARN, or alias).
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::BlankKeyId`] if `id` is empty or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, EncryptionError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EncryptionError::BlankKeyId);
        }
        Ok(Self(id))
    }

    /// The identifier as passed to the service.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated encrypt/decrypt service addressed by key identifier.
///
/// Implementations may perform network I/O; the returned futures must be
/// `Send` so pipelines can be driven from multi-threaded runtimes.
pub trait EncryptionService: Send + Sync {
    /// Encrypt `plaintext` under `key_id`.
    fn encrypt(
        &self,
        key_id: &KeyId,
        plaintext: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, EncryptionError>> + Send;

    /// Decrypt `ciphertext` under `key_id`.
    ///
    /// Must return [`EncryptionError::Rejected`] when the ciphertext fails
    /// authentication or was produced under a different key.
    fn decrypt(
        &self,
        key_id: &KeyId,
        ciphertext: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, EncryptionError>> + Send;
}

impl<S: EncryptionService> EncryptionService for Arc<S> {
    async fn encrypt(&self, key_id: &KeyId, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        (**self).encrypt(key_id, plaintext).await
    }

    async fn decrypt(&self, key_id: &KeyId, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        (**self).decrypt(key_id, ciphertext).await
    }
}
