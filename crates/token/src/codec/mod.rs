//! The three token stages and the value codec beneath them.
//!
//! # Token layout
//!
//! ```text
//! base64url-no-pad( encrypt( "<expiry epoch-millis>:<start key JSON>" ) )
//! ```
//!
//! Encoding runs [`start_key`] → [`expiry`] → [`encrypted`]; decoding runs the
//! reverse, so authenticity is checked before expiry and expiry before
//! structure.

pub mod attribute;
pub mod encrypted;
pub mod expiry;
pub mod start_key;

pub use attribute::{AttributeCodec, Charset};
pub use encrypted::{EncryptedCodec, MAX_CIPHERTEXT_LEN, MAX_PLAINTEXT_LEN};
pub use expiry::{Clock, ExpiryCodec, SystemClock};
pub use start_key::StartKeyCodec;
