//! Client-side envelope codec.
//!
//! Produces and opens the same `<ivHex>:<dataHex>` envelopes as the server.
//! Encryption is synchronous; decryption is `async` to match the host cipher
//! interfaces it stands in for, and never fails: anything that does not
//! decrypt comes back unchanged.

use std::sync::Arc;

use aes::Aes256;
use cbc::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, Key,
    KeyIvInit,
};
use common::{
    envelope::{self, IV_LEN},
    Value,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::debug;

/// Byte length of the shared AES-256 key.
pub const KEY_LEN: usize = 32;

/// Key baked in at compile time from `FIELD_CRYPT_CLIENT_KEY`, if it was set.
pub const BUILD_KEY: Option<&str> = option_env!("FIELD_CRYPT_CLIENT_KEY");

/// Errors produced while loading the client key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// `FIELD_CRYPT_CLIENT_KEY` was not set when the crate was compiled.
    #[error("FIELD_CRYPT_CLIENT_KEY was not set at build time")]
    Missing,

    /// The hex string has the wrong length.
    #[error("client key must be {} hex characters, got {0}", KEY_LEN * 2)]
    InvalidLength(usize),

    /// The string contains non-hex characters.
    #[error("client key is not valid hex")]
    InvalidHex,
}

/// The shared key. Must equal the server key byte for byte.
pub struct ClientKey([u8; KEY_LEN]);

impl ClientKey {
    /// Parse a key from exactly 64 hex characters. Whitespace is not stripped.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] or [`KeyError::InvalidHex`].
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        if hex_key.len() != KEY_LEN * 2 {
            return Err(KeyError::InvalidLength(hex_key.len()));
        }
        let mut key = [0u8; KEY_LEN];
        hex::decode_to_slice(hex_key, &mut key).map_err(|_| KeyError::InvalidHex)?;
        Ok(Self(key))
    }

    /// The key injected at build time.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Missing`] if none was injected, or a parse error.
    pub fn from_build_env() -> Result<Self, KeyError> {
        Self::from_hex(BUILD_KEY.ok_or(KeyError::Missing)?)
    }
}

impl Drop for ClientKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientKey([REDACTED])")
    }
}

/// Envelope codec bound to the client key. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ClientCipher {
    key: Arc<ClientKey>,
}

impl ClientCipher {
    /// Bind a cipher to `key`.
    pub fn new(key: ClientKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// A cipher over the build-time key.
    ///
    /// # Errors
    ///
    /// See [`ClientKey::from_build_env`].
    pub fn from_build_env() -> Result<Self, KeyError> {
        ClientKey::from_build_env().map(Self::new)
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.seal(plaintext, iv)
    }

    // Borrowed from the shared key; never copied to the stack.
    fn cipher_key(&self) -> &Key<cbc::Encryptor<Aes256>> {
        GenericArray::from_slice(&self.key.0)
    }

    fn seal(&self, plaintext: &str, iv: [u8; IV_LEN]) -> String {
        let data = cbc::Encryptor::<Aes256>::new(self.cipher_key(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        format!("{}{}{}", hex::encode(iv), envelope::SEPARATOR, hex::encode(data))
    }

    /// Decrypt `value`, resolving to `value` itself if it is not an envelope
    /// or does not decrypt under this key.
    pub async fn decrypt(&self, value: &str) -> String {
        match self.open(value) {
            Some(plaintext) => plaintext,
            None => value.to_owned(),
        }
    }

    fn open(&self, value: &str) -> Option<String> {
        let parts = envelope::split(value)?;
        let opened = self.open_parts(parts.iv_hex, parts.data_hex);
        if opened.is_none() {
            debug!("envelope left encrypted");
        }
        opened
    }

    fn open_parts(&self, iv_hex: &str, data_hex: &str) -> Option<String> {
        let mut iv = [0u8; IV_LEN];
        hex::decode_to_slice(iv_hex, &mut iv).ok()?;
        let data = hex::decode(data_hex).ok()?;
        let bytes = cbc::Decryptor::<Aes256>::new(self.cipher_key(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&data)
            .ok()?;
        String::from_utf8(bytes).ok()
    }
}

/// Returns `true` if `value` is a string with the envelope shape.
pub fn is_encrypted(value: &Value) -> bool {
    envelope::is_envelope_value(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_KEY: &str =
        "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
    const IV: [u8; IV_LEN] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
    const JUAN: &str = "000102030405060708090a0b0c0d0e0f:82b8eb101452d8d165e080cc0d34f451";
    const JUAN_OTHER_KEY: &str =
        "000102030405060708090a0b0c0d0e0f:61dd529cc3bbfddcd2fe2e404ca076a2";
    const MANANA: &str = "000102030405060708090a0b0c0d0e0f:a064536287e91fbe52950ebbef013df08fdaa7a54815a36516acb0ef90623601";

    pub(crate) fn test_cipher() -> ClientCipher {
        ClientCipher::new(ClientKey::from_hex(TEST_KEY).unwrap())
    }

    #[test]
    fn parses_key() {
        assert!(ClientKey::from_hex(TEST_KEY).is_ok());
        assert_eq!(
            ClientKey::from_hex("abcd").unwrap_err(),
            KeyError::InvalidLength(4)
        );
        assert_eq!(
            ClientKey::from_hex(&"zz".repeat(KEY_LEN)).unwrap_err(),
            KeyError::InvalidHex
        );
        assert_eq!(
            ClientKey::from_hex(&format!("{TEST_KEY}\n")).unwrap_err(),
            KeyError::InvalidLength(65)
        );
        assert_eq!(
            format!("{:?}", ClientKey::from_hex(TEST_KEY).unwrap()),
            "ClientKey([REDACTED])"
        );
    }

    #[test]
    fn build_key_is_optional_at_compile_time() {
        match BUILD_KEY {
            None => assert_eq!(ClientCipher::from_build_env().unwrap_err(), KeyError::Missing),
            Some(key) => assert_eq!(
                ClientCipher::from_build_env().is_ok(),
                ClientKey::from_hex(key).is_ok()
            ),
        }
    }

    #[test]
    fn matches_reference_vectors() {
        let c = test_cipher();
        assert_eq!(c.seal("Juan Dela Cruz", IV), JUAN);
        assert_eq!(c.seal("Mañana: 10:30 ✓", IV), MANANA);
    }

    #[tokio::test]
    async fn decrypts_reference_vectors() {
        let c = test_cipher();
        assert_eq!(c.decrypt(JUAN).await, "Juan Dela Cruz");
        assert_eq!(c.decrypt(MANANA).await, "Mañana: 10:30 ✓");
    }

    #[tokio::test]
    async fn round_trip_and_fresh_iv() {
        let c = test_cipher();
        let a = c.encrypt("Juan Dela Cruz");
        let b = c.encrypt("Juan Dela Cruz");
        assert_ne!(a, b);
        assert!(envelope::is_envelope(&a));
        assert_eq!(c.decrypt(&a).await, "Juan Dela Cruz");
        assert_eq!(c.decrypt(&c.encrypt("")).await, "");
    }

    #[tokio::test]
    async fn failures_resolve_to_input() {
        let c = test_cipher();
        for value in [
            "plain text",
            JUAN_OTHER_KEY,
            "deadbeefdeadbeefdeadbeefdeadbeef:cafe",
            "000102030405060708090a0b0c0d0e0f:abc",
        ] {
            assert_eq!(c.decrypt(value).await, value);
        }
    }

    #[test]
    fn cipher_key_borrows_the_key_buffer() {
        let c = test_cipher();
        assert!(std::ptr::eq(c.cipher_key().as_ptr(), c.key.0.as_ptr()));
    }

    #[test]
    fn is_encrypted_checks_shape_only() {
        assert!(is_encrypted(&Value::from(JUAN)));
        assert!(!is_encrypted(&Value::from("Juan")));
        assert!(!is_encrypted(&Value::Null));
    }

    mod properties {
        use super::*;
        use futures::executor::block_on;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn encrypt_then_decrypt_roundtrips(s in any::<String>()) {
                let c = test_cipher();
                prop_assert_eq!(block_on(c.decrypt(&c.encrypt(&s))), s);
            }

            #[test]
            fn decrypt_converges(s in any::<String>()) {
                let c = test_cipher();
                let once = block_on(c.decrypt(&s));
                prop_assert_eq!(block_on(c.decrypt(&once)), once);
            }

            #[test]
            fn decrypt_of_lookalikes_converges(s in "[0-9a-f]{32}:[0-9a-f]{1,96}") {
                let c = test_cipher();
                let once = block_on(c.decrypt(&s));
                prop_assert_eq!(block_on(c.decrypt(&once)), once);
            }
        }
    }
}
