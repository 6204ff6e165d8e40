//! Confidentiality stage: text <-> base64url(ciphertext).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::{InvalidTokenError, TokenErrorKind};

use crate::crypto::{EncryptionError, EncryptionService, KeyId};
use crate::error::TokenError;

/// Largest envelope accepted for encryption, in bytes (the KMS `Encrypt` limit).
pub const MAX_PLAINTEXT_LEN: usize = 4096;

/// Largest ciphertext accepted for decryption, in bytes (the KMS `Decrypt` limit).
pub const MAX_CIPHERTEXT_LEN: usize = 6144;

/// Longest token text that can decode to at most [`MAX_CIPHERTEXT_LEN`] bytes.
const MAX_TOKEN_LEN: usize = MAX_CIPHERTEXT_LEN.div_ceil(3) * 4;

/// Encrypts envelopes into URL-safe tokens under a fixed key.
///
/// The key id is configuration, never read from the token, so an attacker
/// cannot steer decryption towards a key of their choosing.
#[derive(Debug, Clone)]
pub struct EncryptedCodec<S> {
    service: S,
    key_id: KeyId,
}

impl<S: EncryptionService> EncryptedCodec<S> {
    /// Create a codec bound to `key_id` on `service`.
    pub fn new(service: S, key_id: KeyId) -> Self {
        Self { service, key_id }
    }

    /// The key every token is encrypted under.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Encrypt `plaintext` and encode the ciphertext as base64url without padding.
    ///
    /// # Errors
    ///
    /// - `unsupported-value` if `plaintext` is longer than [`MAX_PLAINTEXT_LEN`].
    /// - [`TokenError::Service`] if the encryption service fails.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String, TokenError> {
        if plaintext.len() > MAX_PLAINTEXT_LEN {
            return Err(InvalidTokenError::new(
                TokenErrorKind::UnsupportedValue,
                "",
                format!(
                    "the start key is too large to encrypt ({} bytes, limit {MAX_PLAINTEXT_LEN})",
                    plaintext.len()
                ),
            )
            .into());
        }

        let ciphertext = self
            .service
            .encrypt(&self.key_id, plaintext.as_bytes())
            .await
            .map_err(TokenError::Service)?;
        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }

    /// Decode and decrypt a token.
    ///
    /// # Errors
    ///
    /// - `blank-input` if `token` is empty or whitespace-only.
    /// - `decryption-failed` if `token` is not base64url, decodes to more than
    ///   [`MAX_CIPHERTEXT_LEN`] bytes, the service rejects the ciphertext, or
    ///   the authenticated plaintext is not UTF-8.
    /// - [`TokenError::Service`] for any other service failure.
    pub async fn decrypt(&self, token: &str) -> Result<String, TokenError> {
        if token.trim().is_empty() {
            return Err(InvalidTokenError::new(
                TokenErrorKind::BlankInput,
                token,
                "the token is blank",
            )
            .into());
        }

        if token.len() > MAX_TOKEN_LEN {
            return Err(InvalidTokenError::new(
                TokenErrorKind::DecryptionFailed,
                token,
                "the token is too long",
            )
            .into());
        }

        let ciphertext = URL_SAFE_NO_PAD.decode(token).map_err(|e| {
            InvalidTokenError::new(
                TokenErrorKind::DecryptionFailed,
                token,
                "the token is not valid base64url",
            )
            .with_source(e)
        })?;

        let plaintext = match self.service.decrypt(&self.key_id, &ciphertext).await {
            Ok(plaintext) => plaintext,
            Err(e @ EncryptionError::Rejected(_)) => {
                return Err(InvalidTokenError::new(
                    TokenErrorKind::DecryptionFailed,
                    token,
                    "the token failed authentication",
                )
                .with_source(e)
                .into());
            }
            Err(e) => return Err(TokenError::Service(e)),
        };

        String::from_utf8(plaintext).map_err(|e| {
            InvalidTokenError::new(
                TokenErrorKind::DecryptionFailed,
                token,
                "the decrypted token is not valid UTF-8",
            )
            .with_source(e)
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::{AeadKeyring, KeyMaterial};

    fn key_id(id: &str) -> KeyId {
        KeyId::new(id).unwrap()
    }

    fn keyring() -> Arc<AeadKeyring> {
        Arc::new(
            AeadKeyring::new()
                .with_key(key_id("a"), KeyMaterial::generate())
                .with_key(key_id("b"), KeyMaterial::generate()),
        )
    }

    struct Unavailable;

    impl EncryptionService for Unavailable {
        async fn encrypt(&self, _: &KeyId, _: &[u8]) -> Result<Vec<u8>, EncryptionError> {
            Err(EncryptionError::Service("throttled".into()))
        }

        async fn decrypt(&self, _: &KeyId, _: &[u8]) -> Result<Vec<u8>, EncryptionError> {
            Err(EncryptionError::Service("throttled".into()))
        }
    }

    /// Fails the test if the codec reaches the service at all.
    struct Untouchable;

    impl EncryptionService for Untouchable {
        async fn encrypt(&self, _: &KeyId, _: &[u8]) -> Result<Vec<u8>, EncryptionError> {
            panic!("encrypt must not be called");
        }

        async fn decrypt(&self, _: &KeyId, _: &[u8]) -> Result<Vec<u8>, EncryptionError> {
            panic!("decrypt must not be called");
        }
    }

    fn kind(err: TokenError) -> Option<TokenErrorKind> {
        err.kind()
    }

    #[tokio::test]
    async fn round_trip_is_url_safe() {
        let codec = EncryptedCodec::new(keyring(), key_id("a"));
        let token = codec.encrypt("1700000000000:{\"id\":{\"S\":\"user#42\"}}").await.unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(
            codec.decrypt(&token).await.unwrap(),
            "1700000000000:{\"id\":{\"S\":\"user#42\"}}"
        );
    }

    #[tokio::test]
    async fn blank_token_rejected() {
        let codec = EncryptedCodec::new(keyring(), key_id("a"));
        for token in ["", "  \t"] {
            let err = codec.decrypt(token).await.unwrap_err();
            assert_eq!(kind(err), Some(TokenErrorKind::BlankInput));
        }
    }

    #[tokio::test]
    async fn invalid_base64_rejected() {
        let codec = EncryptedCodec::new(keyring(), key_id("a"));
        let err = codec.decrypt("not base64!").await.unwrap_err();
        assert_eq!(kind(err), Some(TokenErrorKind::DecryptionFailed));
    }

    #[tokio::test]
    async fn other_key_rejected() {
        let ring = keyring();
        let token = EncryptedCodec::new(ring.clone(), key_id("a"))
            .encrypt("payload")
            .await
            .unwrap();
        let err = EncryptedCodec::new(ring, key_id("b")).decrypt(&token).await.unwrap_err();
        assert_eq!(kind(err), Some(TokenErrorKind::DecryptionFailed));
    }

    #[tokio::test]
    async fn service_failures_pass_through() {
        let codec = EncryptedCodec::new(Unavailable, key_id("a"));
        assert!(matches!(
            codec.encrypt("payload").await,
            Err(TokenError::Service(EncryptionError::Service(_)))
        ));
        assert!(matches!(
            codec.decrypt("AAAA").await,
            Err(TokenError::Service(EncryptionError::Service(_)))
        ));
    }

    #[tokio::test]
    async fn non_utf8_plaintext_rejected() {
        let ring = keyring();
        let sealed = ring.encrypt(&key_id("a"), &[0xFF, 0xFE]).await.unwrap();
        let token = URL_SAFE_NO_PAD.encode(sealed);
        let err = EncryptedCodec::new(ring, key_id("a")).decrypt(&token).await.unwrap_err();
        assert_eq!(kind(err), Some(TokenErrorKind::DecryptionFailed));
    }

    #[tokio::test]
    async fn oversized_ciphertext_rejected_before_service() {
        let codec = EncryptedCodec::new(Untouchable, key_id("a"));
        let token = URL_SAFE_NO_PAD.encode(vec![0u8; MAX_CIPHERTEXT_LEN + 1]);
        let err = codec.decrypt(&token).await.unwrap_err();
        assert!(err.is_invalid_token());
        assert_eq!(kind(err), Some(TokenErrorKind::DecryptionFailed));
    }

    #[tokio::test]
    async fn ciphertext_at_limit_reaches_service() {
        let codec = EncryptedCodec::new(Unavailable, key_id("a"));
        let token = URL_SAFE_NO_PAD.encode(vec![0u8; MAX_CIPHERTEXT_LEN]);
        assert_eq!(token.len(), MAX_TOKEN_LEN);
        assert!(matches!(
            codec.decrypt(&token).await,
            Err(TokenError::Service(EncryptionError::Service(_)))
        ));
    }

    #[tokio::test]
    async fn oversized_plaintext_rejected_before_service() {
        let codec = EncryptedCodec::new(Untouchable, key_id("a"));
        let err = codec.encrypt(&"x".repeat(MAX_PLAINTEXT_LEN + 1)).await.unwrap_err();
        assert_eq!(kind(err), Some(TokenErrorKind::UnsupportedValue));

        let codec = EncryptedCodec::new(keyring(), key_id("a"));
        assert!(codec.encrypt(&"x".repeat(MAX_PLAINTEXT_LEN)).await.is_ok());
    }

    #[test]
    fn key_id_is_configuration() {
        let codec = EncryptedCodec::new(Unavailable, key_id("alias/tokens"));
        assert_eq!(codec.key_id().as_str(), "alias/tokens");
    }
}
