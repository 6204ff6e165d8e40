//! AWS KMS as the token encryption service.
//!
//! Every call binds a fixed encryption context, and decrypt names the
//! expected key so KMS itself refuses ciphertext from any other key.

pub mod kms;

pub use kms::KmsEncryptionService;
