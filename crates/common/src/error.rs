//! Common error types shared across crates.

use std::fmt;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a pagination token was rejected (or could not be produced).
///
/// API layers are expected to answer every kind with an "invalid pagination
/// request" response rather than a server fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    /// Empty or whitespace-only input at any stage.
    BlankInput,
    /// The start key document does not parse or has the wrong shape.
    MalformedStructure,
    /// The expiry envelope cannot be split into timestamp and payload.
    MalformedEnvelope,
    /// The current time is past the embedded expiry instant.
    Expired,
    /// Transport decoding or authenticated decryption failed.
    DecryptionFailed,
    /// A tagged value cannot be represented as text (encode side only).
    UnsupportedValue,
}

impl TokenErrorKind {
    /// Stable machine-readable code, e.g. `"decryption-failed"`.
    pub fn code(&self) -> &'static str {
        match self {
            TokenErrorKind::BlankInput => "blank-input",
            TokenErrorKind::MalformedStructure => "malformed-structure",
            TokenErrorKind::MalformedEnvelope => "malformed-envelope",
            TokenErrorKind::Expired => "expired",
            TokenErrorKind::DecryptionFailed => "decryption-failed",
            TokenErrorKind::UnsupportedValue => "unsupported-value",
        }
    }
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A pagination token that failed validation at some stage of the codec.
///
/// Always carries the token string the caller handed in, plus the underlying
/// cause where one exists. The token is deliberately left out of the
/// `Display` output; use [`InvalidTokenError::token`] for diagnostics.
#[derive(Debug, Error)]
#[error("invalid pagination token ({kind}): {message}")]
pub struct InvalidTokenError {
    kind: TokenErrorKind,
    token: String,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl InvalidTokenError {
    /// Construct an error of the given kind for `token`.
    pub fn new(kind: TokenErrorKind, token: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying failure.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Replace the recorded token, e.g. with the caller's original token once
    /// an inner stage has failed on an intermediate value.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// The failure discriminator.
    pub fn kind(&self) -> TokenErrorKind {
        self.kind
    }

    /// The token (or stage input) that was rejected.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Human-readable reason, safe to show to callers.
    pub fn message(&self) -> &str {
        &self.message
    }
}
