//! [`EncryptionKey`]: the single process-wide AES-256 key.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Hex length of a configured key.
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// Errors produced while parsing the configured key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The hex string has the wrong length.
    #[error("encryption key must be {} hex characters, got {0}", KEY_HEX_LEN)]
    InvalidLength(usize),

    /// The string contains non-hex characters.
    #[error("encryption key is not valid hex")]
    InvalidHex,
}

/// Fixed-size key buffer holding exactly [`KEY_LEN`] bytes.
///
/// Parsed once at startup and shared behind an `Arc`; there is no way to
/// mutate it afterwards. When dropped, the memory is overwritten with zeroes.
pub struct EncryptionKey(Box<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Parse a key from exactly 64 hex characters (either case).
    ///
    /// Surrounding whitespace is not stripped and counts toward the length.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] or [`KeyError::InvalidHex`].
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        if hex_key.len() != KEY_HEX_LEN {
            return Err(KeyError::InvalidLength(hex_key.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        hex::decode_to_slice(hex_key, &mut buf[..]).map_err(|_| KeyError::InvalidHex)?;
        Ok(Self(buf))
    }

    /// Raw key bytes.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// First 8 bytes of SHA-256 over the key, hex-encoded.
    ///
    /// Safe to log; lets operators confirm both runtimes share a key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0[..]);
        hex::encode(&digest[..8])
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("EncryptionKey([REDACTED])")
    }
}
