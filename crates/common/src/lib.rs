//! Shared data model and error taxonomy for `pagination-token` crates.

pub mod attribute;
pub mod error;

pub use attribute::{StartKey, TaggedValue};
pub use error::{InvalidTokenError, TokenErrorKind};
