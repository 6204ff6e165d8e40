//! Pipeline-level error type.

use common::{InvalidTokenError, TokenErrorKind};
use thiserror::Error;

use crate::crypto::EncryptionError;

/// Failure of an encode or decode call.
///
/// Splits the two sides of the contract: [`TokenError::Invalid`] means the
/// caller's token (or start key) is at fault and should be answered as an
/// invalid pagination request; [`TokenError::Service`] is the encryption
/// service's own failure, passed through untouched.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token failed validation at some stage.
    #[error(transparent)]
    Invalid(#[from] InvalidTokenError),

    /// The encryption service could not complete the call.
    #[error(transparent)]
    Service(EncryptionError),
}

impl TokenError {
    /// The invalid-token discriminator, if this is an invalid-token failure.
    pub fn kind(&self) -> Option<TokenErrorKind> {
        match self {
            TokenError::Invalid(e) => Some(e.kind()),
            TokenError::Service(_) => None,
        }
    }

    /// Returns `true` if the caller's input is at fault rather than the service.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, TokenError::Invalid(_))
    }

    pub(crate) fn with_token(self, token: &str) -> Self {
        match self {
            TokenError::Invalid(e) => TokenError::Invalid(e.with_token(token)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_exposes_kind() {
        let e = TokenError::from(InvalidTokenError::new(TokenErrorKind::Expired, "t", "expired"));
        assert_eq!(e.kind(), Some(TokenErrorKind::Expired));
        assert!(e.is_invalid_token());
    }

    #[test]
    fn service_has_no_kind() {
        let e = TokenError::Service(EncryptionError::Service("throttled".into()));
        assert_eq!(e.kind(), None);
        assert!(!e.is_invalid_token());
        assert!(e.to_string().contains("throttled"));
    }

    #[test]
    fn with_token_only_touches_invalid() {
        let inner = InvalidTokenError::new(TokenErrorKind::BlankInput, "inner", "blank");
        let e = TokenError::from(inner).with_token("outer");
        match e {
            TokenError::Invalid(inner) => assert_eq!(inner.token(), "outer"),
            TokenError::Service(_) => panic!("expected invalid"),
        }
    }
}
