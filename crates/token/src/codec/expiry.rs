//! Time-bounded envelope: `"<expiry epoch-millis>:<payload>"`.
//!
//! Expiry instants are absolute UTC epoch milliseconds taken from a single
//! server-side [`Clock`]; the client's clock never takes part. A token is
//! still valid at exactly its expiry millisecond.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{InvalidTokenError, TokenErrorKind};

/// Separates the expiry timestamp from the payload.
pub const SEPARATOR: char = ':';

/// Source of the current time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wraps payloads with an expiry instant and enforces it on the way back.
#[derive(Clone)]
pub struct ExpiryCodec {
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ExpiryCodec {
    /// Create a codec that stamps payloads with `now + ttl`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock }
    }

    /// The time-to-live applied to every wrapped payload.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Prefix `payload` with its expiry instant.
    ///
    /// # Errors
    ///
    /// Returns an `unsupported-value` error if `now + ttl` overflows the
    /// representable time range.
    pub fn wrap(&self, payload: &str) -> Result<String, InvalidTokenError> {
        let expires_at = self.clock.now().checked_add_signed(self.ttl).ok_or_else(|| {
            InvalidTokenError::new(
                TokenErrorKind::UnsupportedValue,
                "",
                "token expiry is out of range",
            )
        })?;
        Ok(format!("{}{SEPARATOR}{payload}", expires_at.timestamp_millis()))
    }

    /// Strip and check the expiry instant, returning the payload.
    ///
    /// # Errors
    ///
    /// - `blank-input` if `envelope` is empty or whitespace-only.
    /// - `malformed-envelope` if there is no separator or the timestamp is not
    ///   an integer.
    /// - `expired` if the current time is strictly after the expiry instant.
    pub fn unwrap(&self, envelope: &str) -> Result<String, InvalidTokenError> {
        if envelope.trim().is_empty() {
            return Err(InvalidTokenError::new(
                TokenErrorKind::BlankInput,
                envelope,
                "the expiry envelope is blank",
            ));
        }

        let (timestamp, payload) = envelope.split_once(SEPARATOR).ok_or_else(|| {
            InvalidTokenError::new(
                TokenErrorKind::MalformedEnvelope,
                envelope,
                "the expiry envelope has no separator",
            )
        })?;

        let expires_at: i64 = timestamp.parse().map_err(|e| {
            InvalidTokenError::new(
                TokenErrorKind::MalformedEnvelope,
                envelope,
                "the expiry timestamp is not an integer",
            )
            .with_source(e)
        })?;

        if self.clock.now().timestamp_millis() > expires_at {
            return Err(InvalidTokenError::new(
                TokenErrorKind::Expired,
                envelope,
                "the pagination token has expired",
            ));
        }

        Ok(payload.to_owned())
    }
}
