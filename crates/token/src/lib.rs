//! Encrypted, self-expiring continuation tokens for paginated store queries.
//!
//! A [`PaginationTokenCodec`] turns the last-evaluated [`StartKey`] of a page
//! into an opaque, URL-safe token and back:
//!
//! ```text
//! start key ─▶ JSON ─▶ "<expiry>:<JSON>" ─▶ encrypt ─▶ base64url
//! ```
//!
//! Decoding checks authenticity first, then expiry, then structure, and fails
//! closed with an [`InvalidTokenError`] carrying a [`TokenErrorKind`].

pub mod aws;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod pipeline;

pub use common::{InvalidTokenError, StartKey, TaggedValue, TokenErrorKind};

pub use aws::KmsEncryptionService;
pub use codec::{Charset, Clock, SystemClock};
pub use crypto::{AeadKeyring, EncryptionError, EncryptionService, KeyId, KeyMaterial, NonceMode};
pub use error::TokenError;
pub use pipeline::{PaginationTokenCodec, PipelineConfig, PipelineConfigError, DEFAULT_TOKEN_TTL};
