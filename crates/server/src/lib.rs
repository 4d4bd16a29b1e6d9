//! Document API with transparent field-level encryption.
//!
//! Sensitive string fields are sealed with AES-256-CBC into `ivHex:dataHex`
//! envelopes before they reach the store, and opened again before they reach
//! the caller. Inbound request bodies that were encrypted by the client
//! runtime are decrypted before routing.

pub mod config;
pub mod crypto;
pub mod http;
pub mod persistence;
pub mod policy;
pub mod telemetry;
pub mod transform;
