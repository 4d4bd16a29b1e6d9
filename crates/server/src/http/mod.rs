//! Axum HTTP(S) server, routing, and middleware.
//!
//! # Responsibilities
//! - Decrypt inbound JSON bodies before routing (skip-list mode).
//! - Define the document routes and map errors to HTTP statuses.
//! - Optionally terminate TLS with rustls.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;

pub use state::AppState;
