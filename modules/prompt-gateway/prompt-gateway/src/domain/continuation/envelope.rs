use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use thiserror::Error;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes; the nonce is prepended to every sealed message.
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("encryption key must be {KEY_LEN} bytes, got {len}")]
    InvalidKeyLength { len: usize },

    #[error("sealed data too short: {len} bytes, need at least {NONCE_LEN}")]
    TooShort { len: usize },

    #[error("authentication failed: data was tampered with or sealed under another key")]
    TamperDetected,

    #[error("encryption failed")]
    SealFailed,
}

/// Authenticated symmetric encryption with a fresh random nonce per seal.
pub struct CryptoEnvelope {
    cipher: Aes256Gcm,
}

impl fmt::Debug for CryptoEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoEnvelope").finish_non_exhaustive()
    }
}

impl CryptoEnvelope {
    /// # Errors
    /// Returns [`EnvelopeError::InvalidKeyLength`] unless `key` is exactly [`KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, EnvelopeError> {
        if key.len() != KEY_LEN {
            return Err(EnvelopeError::InvalidKeyLength { len: key.len() });
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| EnvelopeError::InvalidKeyLength { len: key.len() })?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`, returning `nonce ‖ ciphertext ‖ tag`.
    ///
    /// # Errors
    /// Returns [`EnvelopeError::SealFailed`] if the cipher rejects the input.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| EnvelopeError::SealFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Split off the nonce, then decrypt and authenticate the rest.
    ///
    /// # Errors
    /// [`EnvelopeError::TooShort`] when `sealed` cannot even hold a nonce,
    /// [`EnvelopeError::TamperDetected`] when authentication fails.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        if sealed.len() < NONCE_LEN {
            return Err(EnvelopeError::TooShort { len: sealed.len() });
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EnvelopeError::TamperDetected)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const KEY: &[u8; KEY_LEN] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn key_length_enforced() {
        assert_eq!(
            CryptoEnvelope::new(b"short").unwrap_err(),
            EnvelopeError::InvalidKeyLength { len: 5 }
        );
        assert!(CryptoEnvelope::new(&[0u8; 33]).is_err());
        assert!(CryptoEnvelope::new(KEY).is_ok());
    }

    #[test]
    fn seal_then_open() {
        let envelope = CryptoEnvelope::new(KEY).unwrap();
        let sealed = envelope.seal(b"hello").unwrap();

        assert_eq!(sealed.len(), NONCE_LEN + 5 + 16);
        assert_eq!(envelope.open(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn nonce_is_fresh_per_seal() {
        let envelope = CryptoEnvelope::new(KEY).unwrap();
        let a = envelope.seal(b"same").unwrap();
        let b = envelope.seal(b"same").unwrap();

        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn short_input_is_distinct_error() {
        let envelope = CryptoEnvelope::new(KEY).unwrap();
        assert_eq!(
            envelope.open(&[0u8; NONCE_LEN - 1]).unwrap_err(),
            EnvelopeError::TooShort { len: NONCE_LEN - 1 }
        );
        // Exactly a nonce and nothing else cannot authenticate.
        assert_eq!(
            envelope.open(&[0u8; NONCE_LEN]).unwrap_err(),
            EnvelopeError::TamperDetected
        );
    }

    #[test]
    fn wrong_key_is_tamper() {
        let sealed = CryptoEnvelope::new(KEY).unwrap().seal(b"secret").unwrap();
        let other = CryptoEnvelope::new(&[7u8; KEY_LEN]).unwrap();

        assert_eq!(other.open(&sealed).unwrap_err(), EnvelopeError::TamperDetected);
    }
}
