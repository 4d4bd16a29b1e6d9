//! Response bodies returned by the document API.
//!
//! Document payloads themselves are arbitrary JSON objects and are not typed
//! here.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Response body for `GET /collections/:collection/documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentList {
    /// Matching documents, sensitive fields already decrypted.
    pub documents: Vec<serde_json::Value>,
    /// Number of entries in `documents`.
    pub count: usize,
}

impl DocumentList {
    /// Wrap a list of document payloads.
    pub fn new(documents: Vec<serde_json::Value>) -> Self {
        let count = documents.len();
        Self { documents, count }
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: String,
    /// Truncated SHA-256 of the active key, for checking client/server key parity.
    pub key_fingerprint: String,
    /// Number of collections with a declared field policy.
    pub collections: usize,
}
