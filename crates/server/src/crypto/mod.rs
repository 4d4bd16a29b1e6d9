//! AES-256-CBC field envelope codec.
//!
//! This module is intentionally free of HTTP and storage dependencies.
//! It provides the key type and the encrypt/decrypt operations used by the
//! transformer and the persistence hooks.
//!
//! # Ciphertext format
//!
//! ```text
//! <hex(iv)>:<hex(aes-256-cbc-pkcs7(plaintext))>
//! ```
//!
//! See [`common::envelope`] for the shape check shared with the client.

pub mod cipher;
pub mod key;

pub use cipher::{DecryptError, FieldCipher};
pub use key::{EncryptionKey, KeyError, KEY_LEN};
