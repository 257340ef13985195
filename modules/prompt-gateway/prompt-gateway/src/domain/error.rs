//! Domain errors for the prompt gateway.

use prompt_gateway_sdk::{LedgerError, ProviderError, ServiceKind};
use thiserror::Error;

use super::continuation::ContinuationError;
use super::metering::MeteringError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown prompt '{name}'")]
    UnknownPrompt { name: String },

    #[error("no adapter for service '{service}'")]
    UnsupportedService { service: ServiceKind },

    #[error("invalid continuation: {0}")]
    InvalidContinuation(#[source] ContinuationError),

    #[error("failed to seal continuation: {0}")]
    Seal(#[source] ContinuationError),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    #[error("model provider failure: {0}")]
    Provider(#[from] ProviderError),
}

impl From<MeteringError> for DomainError {
    fn from(e: MeteringError) -> Self {
        match e {
            MeteringError::InsufficientFunds => Self::InsufficientFunds,
            MeteringError::Ledger(e) => Self::Ledger(e),
            MeteringError::Provider(e) => Self::Provider(e),
        }
    }
}
