//! Types shared by the server and client field-encryption runtimes.
//!
//! Both runtimes implement their own cipher, but they must agree on the
//! envelope shape, on which fields are never encrypted, and on the payload
//! value model. Those pieces live here.

pub mod envelope;
pub mod error;
pub mod fields;
pub mod protocol;
pub mod value;

pub use error::ServiceError;
pub use value::{Map, Value};
