//! Client-side counterpart of the field encryption server.
//!
//! Encrypts outgoing request bodies (every string leaf except identifiers and
//! timestamps) with the shared build-time key, and decrypts every envelope in
//! incoming response bodies. Uses the same envelope format as the server, so
//! either side can open what the other sealed.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use client::{ClientCipher, EncryptionLayer, JsonTransport};
//! use common::Value;
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! let svc = ServiceBuilder::new()
//!     .layer(EncryptionLayer::new(ClientCipher::from_build_env()?))
//!     .service(JsonTransport::new());
//! let req = http::Request::post("http://localhost:8080/collections/users/documents")
//!     .body(Value::from(serde_json::json!({"name": "Juan Dela Cruz"})))?;
//! let created = svc.oneshot(req).await?.into_body();
//! # Ok(()) }
//! ```

pub mod cipher;
pub mod layer;
pub mod transform;
pub mod transport;

pub use cipher::{is_encrypted, ClientCipher, ClientKey, KeyError};
pub use layer::{EncryptionLayer, EncryptionService};
pub use transform::{decrypt_response, encrypt_request};
pub use transport::{JsonTransport, TransportError};
