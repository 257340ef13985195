use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use prompt_gateway_sdk::ConversationState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::envelope::{CryptoEnvelope, EnvelopeError};

/// What a continuation token carries: the prompt it belongs to and the full
/// provider-specific conversation so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub prompt: String,
    pub model_context: ConversationState,
}

/// One variant per stage so logs can tell malformed input from forged input.
#[derive(Debug, Error)]
pub enum ContinuationError {
    #[error("continuation is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("continuation too short: {len} bytes")]
    TooShort { len: usize },

    #[error("continuation failed authentication")]
    TamperDetected,

    #[error("continuation decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("continuation payload has unexpected shape: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("continuation serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("continuation compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("continuation encryption failed")]
    Seal,
}

impl ContinuationError {
    /// `true` for failures caused by the caller's token rather than by this process.
    #[must_use]
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            Self::Base64(_)
                | Self::TooShort { .. }
                | Self::TamperDetected
                | Self::Decompress(_)
                | Self::Deserialize(_)
        )
    }
}

impl From<EnvelopeError> for ContinuationError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::TooShort { len } => Self::TooShort { len },
            EnvelopeError::TamperDetected => Self::TamperDetected,
            // A constructed envelope always holds a valid key.
            EnvelopeError::SealFailed | EnvelopeError::InvalidKeyLength { .. } => Self::Seal,
        }
    }
}

/// Seals conversation state into opaque tokens and opens them again.
#[derive(Debug)]
pub struct ContinuationCodec {
    envelope: CryptoEnvelope,
}

impl ContinuationCodec {
    #[must_use]
    pub fn new(envelope: CryptoEnvelope) -> Self {
        Self { envelope }
    }

    /// JSON, gzip at best compression, seal, standard base64.
    ///
    /// Tokens are not canonical: sealing the same state twice yields different
    /// tokens because of the fresh nonce.
    ///
    /// # Errors
    /// [`ContinuationError::Serialize`], [`ContinuationError::Compress`] or
    /// [`ContinuationError::Seal`].
    pub fn seal(
        &self,
        prompt: &str,
        state: &ConversationState,
    ) -> Result<String, ContinuationError> {
        let payload = ContinuationRef {
            prompt,
            model_context: state,
        };
        let json = serde_json::to_vec(&payload).map_err(ContinuationError::Serialize)?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&json).map_err(ContinuationError::Compress)?;
        let compressed = encoder.finish().map_err(ContinuationError::Compress)?;

        let sealed = self.envelope.seal(&compressed)?;
        Ok(STANDARD.encode(sealed))
    }

    /// Reverse of [`Self::seal`]; every stage fails with its own variant.
    ///
    /// # Errors
    /// Any caller-fault [`ContinuationError`] variant.
    pub fn open(&self, token: &str) -> Result<Continuation, ContinuationError> {
        let sealed = STANDARD.decode(token)?;
        let compressed = self.envelope.open(&sealed)?;

        let mut json = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut json)
            .map_err(ContinuationError::Decompress)?;

        serde_json::from_slice(&json).map_err(ContinuationError::Deserialize)
    }
}

#[derive(Serialize)]
struct ContinuationRef<'a> {
    prompt: &'a str,
    model_context: &'a ConversationState,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::continuation::{KEY_LEN, NONCE_LEN};
    use serde_json::json;

    fn codec() -> ContinuationCodec {
        ContinuationCodec::new(CryptoEnvelope::new(&[42u8; KEY_LEN]).unwrap())
    }

    fn state() -> ConversationState {
        ConversationState(json!({
            "model": "claude-3-haiku-20240307",
            "max_tokens": 512,
            "temperature": 0.7,
            "system": "You are terse.",
            "messages": [
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi"}
            ]
        }))
    }

    #[test]
    fn round_trip_restores_prompt_and_state() {
        let codec = codec();
        let token = codec.seal("summarize", &state()).unwrap();
        let opened = codec.open(&token).unwrap();

        assert_eq!(opened.prompt, "summarize");
        assert_eq!(opened.model_context, state());
    }

    #[test]
    fn round_trip_with_unicode_and_empty_state() {
        let codec = codec();
        let s = ConversationState(json!({"messages": [], "note": "héllo ✓ 日本"}));
        let opened = codec.open(&codec.seal("übersetzen", &s).unwrap()).unwrap();

        assert_eq!(opened.prompt, "übersetzen");
        assert_eq!(opened.model_context, s);
    }

    #[test]
    fn tokens_are_not_canonical() {
        let codec = codec();
        let a = codec.seal("p", &state()).unwrap();
        let b = codec.seal("p", &state()).unwrap();

        assert_ne!(a, b);
        assert_eq!(codec.open(&a).unwrap(), codec.open(&b).unwrap());
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let codec = codec();
        let token = codec.seal("p", &ConversationState(json!({"m": 1}))).unwrap();
        let raw = STANDARD.decode(&token).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let err = codec.open(&STANDARD.encode(&tampered)).unwrap_err();
                assert!(
                    matches!(err, ContinuationError::TamperDetected),
                    "byte {byte} bit {bit}: {err}"
                );
            }
        }
    }

    #[test]
    fn truncation_is_detected() {
        let codec = codec();
        let raw = STANDARD.decode(codec.seal("p", &state()).unwrap()).unwrap();

        let err = codec
            .open(&STANDARD.encode(&raw[..raw.len() - 1]))
            .unwrap_err();
        assert!(matches!(err, ContinuationError::TamperDetected));
    }

    #[test]
    fn input_shorter_than_nonce_is_too_short() {
        let err = codec()
            .open(&STANDARD.encode([0u8; NONCE_LEN - 1]))
            .unwrap_err();
        assert!(matches!(err, ContinuationError::TooShort { len: 11 }));
    }

    #[test]
    fn invalid_base64_is_distinct() {
        let err = codec().open("not base64 at all!").unwrap_err();
        assert!(matches!(err, ContinuationError::Base64(_)));
        assert!(err.is_caller_fault());
    }

    #[test]
    fn authentic_but_not_gzip_is_decompress_error() {
        let envelope = CryptoEnvelope::new(&[42u8; KEY_LEN]).unwrap();
        let token = STANDARD.encode(envelope.seal(b"plain bytes").unwrap());

        let err = codec().open(&token).unwrap_err();
        assert!(matches!(err, ContinuationError::Decompress(_)));
    }

    #[test]
    fn authentic_but_wrong_shape_is_deserialize_error() {
        let envelope = CryptoEnvelope::new(&[42u8; KEY_LEN]).unwrap();
        let mut gz = GzEncoder::new(Vec::new(), Compression::best());
        gz.write_all(br#"{"unexpected": true}"#).unwrap();
        let token = STANDARD.encode(envelope.seal(&gz.finish().unwrap()).unwrap());

        let err = codec().open(&token).unwrap_err();
        assert!(matches!(err, ContinuationError::Deserialize(_)));
    }
}
