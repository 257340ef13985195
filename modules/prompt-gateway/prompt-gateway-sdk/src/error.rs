//! Error types for the prompt gateway collaborators.

use thiserror::Error;

/// Errors reported by a [`ModelProvider`](crate::ModelProvider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request could not be sent or no response arrived.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status and an unreadable body.
    #[error("provider returned status {status}")]
    Status {
        /// HTTP status code returned by the provider.
        status: u16,
    },

    /// The provider reported an application-level error.
    #[error("provider API error: {message}")]
    Api {
        /// Message supplied by the provider.
        message: String,
    },

    /// The provider response did not match the expected shape.
    #[error("provider response decode failed: {0}")]
    Decode(String),

    /// The provider answered without any content blocks.
    #[error("provider returned no content")]
    EmptyResponse,

    /// Conversation state cannot be continued by this provider or prompt.
    #[error("incompatible conversation state: {0}")]
    IncompatibleState(String),
}

/// Errors reported by a [`CreditLedger`](crate::CreditLedger).
///
/// Insufficient funds is *not* an error; it is reported through
/// [`ChargeOutcome::sufficient`](crate::ChargeOutcome).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The ledger answered with a non-success status.
    #[error("ledger returned status {status}")]
    Status {
        /// HTTP status code returned by the ledger.
        status: u16,
    },

    /// The ledger response did not match the expected shape.
    #[error("ledger response decode failed: {0}")]
    Decode(String),
}
