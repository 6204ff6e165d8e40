//! [`PaginationTokenCodec`]: start key <-> opaque continuation token.
//!
//! Encode flow:
//! start key → JSON → JSON with expiry → base64url ciphertext (token)
//!
//! Decode flow:
//! token → plaintext envelope → JSON → start key

use std::sync::Arc;
use std::time::Duration;

use common::StartKey;
use thiserror::Error;
use tracing::debug;

use crate::codec::{
    AttributeCodec, Charset, Clock, EncryptedCodec, ExpiryCodec, StartKeyCodec, SystemClock,
};
use crate::crypto::{EncryptionService, KeyId};
use crate::error::TokenError;

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 5;

/// Lifetime of a token when none is configured.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(DEFAULT_TOKEN_TTL_MINUTES as u64 * 60);

/// Errors from building a pipeline out of a [`PipelineConfig`].
#[derive(Debug, Error)]
pub enum PipelineConfigError {
    /// A zero TTL would issue tokens that are already expired.
    #[error("token TTL must be greater than zero")]
    ZeroTtl,

    /// The TTL does not fit the millisecond timestamp range.
    #[error("token TTL is out of range")]
    TtlOutOfRange,
}

/// Everything a pipeline needs besides the encryption service itself.
///
/// Built once and shared by every stage so the charset, TTL, and key id stay
/// consistent between encode and decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Key every token is encrypted under.
    pub key_id: KeyId,
    /// How long an issued token stays valid.
    pub ttl: Duration,
    /// Text encoding for binary attribute values.
    pub charset: Charset,
}

impl PipelineConfig {
    /// Configuration with the default TTL and charset.
    pub fn new(key_id: KeyId) -> Self {
        Self {
            key_id,
            ttl: DEFAULT_TOKEN_TTL,
            charset: Charset::default(),
        }
    }

    /// Override the token TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the binary charset.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    fn expiry_ttl(&self) -> Result<chrono::Duration, PipelineConfigError> {
        if self.ttl.is_zero() {
            return Err(PipelineConfigError::ZeroTtl);
        }
        chrono::Duration::from_std(self.ttl).map_err(|_| PipelineConfigError::TtlOutOfRange)
    }
}

/// Turns start keys into encrypted, self-expiring tokens and back.
///
/// Holds only immutable configuration, so one instance can serve concurrent
/// callers (wrap it in an `Arc` to share it).
pub struct PaginationTokenCodec<S> {
    config: PipelineConfig,
    start_key: StartKeyCodec,
    expiry: ExpiryCodec,
    encrypted: EncryptedCodec<S>,
}

impl<S: EncryptionService> PaginationTokenCodec<S> {
    /// Build a codec with the default TTL ([`DEFAULT_TOKEN_TTL`]) and charset.
    pub fn new(service: S, key_id: KeyId) -> Self {
        let config = PipelineConfig::new(key_id);
        Self::assemble(service, config, chrono::Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES))
    }

    /// Build a codec from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineConfigError`] if the TTL is zero or out of range.
    pub fn with_config(service: S, config: PipelineConfig) -> Result<Self, PipelineConfigError> {
        let ttl = config.expiry_ttl()?;
        Ok(Self::assemble(service, config, ttl))
    }

    /// Replace the clock used to stamp and check expiry instants.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.expiry = ExpiryCodec::new(self.expiry.ttl(), clock);
        self
    }

    fn assemble(service: S, config: PipelineConfig, ttl: chrono::Duration) -> Self {
        Self {
            start_key: StartKeyCodec::new(AttributeCodec::new(config.charset)),
            expiry: ExpiryCodec::new(ttl, Arc::new(SystemClock)),
            encrypted: EncryptedCodec::new(service, config.key_id.clone()),
            config,
        }
    }

    /// The configuration this codec was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Encode `start_key` into a token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] (`unsupported-value`) if an attribute
    /// cannot be represented, or [`TokenError::Service`] if encryption fails.
    pub async fn encode(&self, start_key: &StartKey) -> Result<String, TokenError> {
        let json = self.start_key.serialize(start_key)?;
        let envelope = self.expiry.wrap(&json)?;
        let token = self.encrypted.encrypt(&envelope).await?;
        debug!(attributes = start_key.len(), "pagination token issued");
        Ok(token)
    }

    /// Decode a token back into the start key it was issued for.
    ///
    /// Stages run in a fixed order: authenticity, then expiry, then structure.
    /// Invalid-token errors always report `token` as given by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] with the failing stage's kind, or
    /// [`TokenError::Service`] if the encryption service is unavailable.
    pub async fn decode(&self, token: &str) -> Result<StartKey, TokenError> {
        let result = self.decode_stages(token).await.map_err(|e| e.with_token(token));
        match &result {
            Ok(start_key) => debug!(attributes = start_key.len(), "pagination token accepted"),
            Err(TokenError::Invalid(e)) => debug!(kind = %e.kind(), "pagination token rejected"),
            Err(TokenError::Service(e)) => debug!(error = %e, "pagination token not checked"),
        }
        result
    }

    async fn decode_stages(&self, token: &str) -> Result<StartKey, TokenError> {
        let envelope = self.encrypted.decrypt(token).await?;
        let json = self.expiry.unwrap(&envelope)?;
        Ok(self.start_key.deserialize(&json)?)
    }
}
