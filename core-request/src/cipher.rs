//! Decryption of encrypted response bodies.
//!
//! Any [`ResponseCipher`] can be attached to a descriptor. The shipped one,
//! [`DecryptionKey`], expects AES-256-GCM payloads: the first 12 bytes are the
//! nonce, the rest is ciphertext followed by the 16-byte authentication tag.

use crate::error::DecodeError;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Key, Nonce,
};
use bytes::Bytes;
use std::fmt;

/// Turns an encrypted response body into plaintext.
///
/// Failures (bad padding, wrong size, failed authentication) are reported as
/// [`DecodeError::Cipher`].
pub trait ResponseCipher: Send + Sync + fmt::Debug {
    fn decrypt(&self, payload: &[u8]) -> Result<Bytes, DecodeError>;
}

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Key used to decrypt response bodies.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptionKey {
    key_bytes: [u8; 32],
}

impl DecryptionKey {
    /// Create from raw key bytes. AES-256 needs exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            DecodeError::Cipher(format!(
                "Invalid key length: expected 32 bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Self { key_bytes })
    }

    /// Create from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| DecodeError::Cipher(format!("Invalid hex key: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.key_bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key_bytes))
    }

    pub fn decrypt(&self, payload: &[u8]) -> Result<Bytes, DecodeError> {
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(DecodeError::Cipher(format!(
                "Payload too short: {} bytes",
                payload.len()
            )));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DecodeError::Cipher("Authentication failed".to_string()))?;

        Ok(Bytes::from(plaintext))
    }

    /// Encrypt `plaintext` with a random nonce, producing the layout
    /// [`decrypt`](Self::decrypt) expects.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Bytes, DecodeError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|e| DecodeError::Cipher(format!("Encryption failed: {}", e)))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(Bytes::from(payload))
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey")
            .field("key_bytes", &"[REDACTED]")
            .finish()
    }
}

impl ResponseCipher for DecryptionKey {
    fn decrypt(&self, payload: &[u8]) -> Result<Bytes, DecodeError> {
        DecryptionKey::decrypt(self, payload)
    }
}
