//! Structured logging and optional OTLP trace export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, ciphertext, or key material** may appear in any span
//!   attribute or log field. The key is identified only by its fingerprint.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
