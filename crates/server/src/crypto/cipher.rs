//! AES-256-CBC encryption and decryption of individual string fields.
//!
//! Every call draws a fresh 16-byte IV from the OS CSPRNG, so the same
//! plaintext never yields the same envelope twice. There is no
//! authentication tag: a tampered envelope is detected only when PKCS#7
//! unpadding or UTF-8 decoding fails, and even then only probabilistically.

use std::sync::Arc;

use aes::Aes256;
use cbc::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, Key,
    KeyIvInit,
};
use common::envelope::{self, IV_LEN};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::debug;

use super::key::EncryptionKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Why a value was left as it was instead of being decrypted.
///
/// [`FieldCipher::try_decrypt`] surfaces this; [`FieldCipher::decrypt`]
/// collapses every variant to "return the input unchanged".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    /// The value does not have the envelope shape; treat it as plaintext.
    #[error("value is not an envelope")]
    NotEnvelope,

    /// The envelope shape matched but a segment is not decodable hex (odd length).
    #[error("envelope segment is not decodable hex")]
    InvalidHex,

    /// Block decryption or PKCS#7 unpadding failed (wrong key, corrupted data).
    #[error("ciphertext failed to decrypt")]
    Unpad,

    /// Decryption produced bytes that are not UTF-8.
    #[error("decrypted bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Envelope codec bound to the process-wide key.
///
/// Cheap to clone; every clone shares the same immutable key.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    key: Arc<EncryptionKey>,
}

impl FieldCipher {
    /// Bind a cipher to `key`.
    pub fn new(key: EncryptionKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Fingerprint of the bound key. See [`EncryptionKey::fingerprint`].
    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    /// Encrypt `plaintext` into a `<ivHex>:<dataHex>` envelope.
    ///
    /// Always encrypts, even if `plaintext` is itself an envelope. Use
    /// [`FieldCipher::encrypt_if_needed`] on values of unknown state.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    // Borrowed from the shared buffer; never copied to the stack.
    fn cipher_key(&self) -> &Key<Aes256CbcEnc> {
        GenericArray::from_slice(self.key.as_bytes())
    }

    fn encrypt_with_iv(&self, plaintext: &str, iv: &[u8; IV_LEN]) -> String {
        let data = Aes256CbcEnc::new(self.cipher_key(), &(*iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        format!("{}{}{}", hex::encode(iv), envelope::SEPARATOR, hex::encode(data))
    }

    /// Encrypt `value` unless it already has the envelope shape.
    pub fn encrypt_if_needed(&self, value: &str) -> String {
        if envelope::is_envelope(value) {
            value.to_owned()
        } else {
            self.encrypt(value)
        }
    }

    /// Decrypt `value`, reporting why it was left alone when it could not be.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::NotEnvelope`] for anything that is not
    /// envelope-shaped, and the other variants for envelopes that do not
    /// decrypt under the bound key.
    pub fn try_decrypt(&self, value: &str) -> Result<String, DecryptError> {
        let parts = envelope::split(value).ok_or(DecryptError::NotEnvelope)?;

        let mut iv = [0u8; IV_LEN];
        hex::decode_to_slice(parts.iv_hex, &mut iv).map_err(|_| DecryptError::InvalidHex)?;
        let data = hex::decode(parts.data_hex).map_err(|_| DecryptError::InvalidHex)?;

        let plaintext = Aes256CbcDec::new(self.cipher_key(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&data)
            .map_err(|_| DecryptError::Unpad)?;

        String::from_utf8(plaintext).map_err(|_| DecryptError::InvalidUtf8)
    }

    /// Decrypt `value`, or return it unchanged if it cannot be decrypted.
    ///
    /// Never fails: plaintext passes through, and an envelope that does not
    /// decrypt comes back as the original envelope string.
    pub fn decrypt(&self, value: &str) -> String {
        match self.try_decrypt(value) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                log_fallback(e);
                value.to_owned()
            }
        }
    }

    /// In-place [`FieldCipher::encrypt_if_needed`].
    pub fn encrypt_in_place(&self, value: &mut String) {
        if !envelope::is_envelope(value) {
            *value = self.encrypt(value);
        }
    }

    /// In-place [`FieldCipher::decrypt`].
    pub fn decrypt_in_place(&self, value: &mut String) {
        match self.try_decrypt(value) {
            Ok(plaintext) => *value = plaintext,
            Err(e) => log_fallback(e),
        }
    }
}

fn log_fallback(err: DecryptError) {
    if err != DecryptError::NotEnvelope {
        debug!(error = %err, "envelope left encrypted");
    }
}
