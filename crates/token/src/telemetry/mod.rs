//! Structured logging for the `pagination-token` binary.
//!
//! # Telemetry invariants
//!
//! - **No start keys, plaintext envelopes, or key material** in any log field.
//!   Rejections are logged by error kind only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when set.
//! - Logs go to stderr; stdout is reserved for command output.

pub mod init;

pub use init::init_telemetry;
