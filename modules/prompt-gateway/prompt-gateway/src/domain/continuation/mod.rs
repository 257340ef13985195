//! Sealing and opening of continuation tokens.
//!
//! Wire format: `base64(nonce(12) ‖ AES-256-GCM(gzip(json({prompt, model_context}))))`.

mod codec;
mod envelope;

pub use codec::{Continuation, ContinuationCodec, ContinuationError};
pub use envelope::{CryptoEnvelope, EnvelopeError, KEY_LEN, NONCE_LEN};
