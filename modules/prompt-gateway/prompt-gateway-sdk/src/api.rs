//! Capability traits the gateway depends on.
//!
//! Both traits are object safe and are held as `Arc<dyn ...>` by the gateway
//! service, so tests can swap in scripted implementations.

use async_trait::async_trait;

use crate::error::{LedgerError, ProviderError};
use crate::models::{
    ChargeOutcome, ConversationState, ModelReply, PromptSpec, PromptVariables, ServiceKind,
};

/// A generative-model vendor adapter.
///
/// One implementation exists per [`ServiceKind`]; the gateway picks the adapter
/// from the prompt's declared service.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// The service this adapter speaks to.
    fn service(&self) -> ServiceKind;

    /// Render the prompt's templates with `variables`, send the first request and
    /// return the resulting conversation state plus the readable answer.
    ///
    /// # Errors
    ///
    /// Any [`ProviderError`] except `IncompatibleState`.
    async fn start_conversation(
        &self,
        spec: &PromptSpec,
        variables: &PromptVariables,
    ) -> Result<ModelReply, ProviderError>;

    /// Append `user_text` verbatim as a new user turn to `state` and send it.
    ///
    /// # Errors
    ///
    /// - `IncompatibleState` if `state` was not produced by this adapter for
    ///   `spec`'s model
    /// - any other [`ProviderError`] from the remote call
    async fn continue_conversation(
        &self,
        spec: &PromptSpec,
        state: ConversationState,
        user_text: &str,
    ) -> Result<ModelReply, ProviderError>;
}

/// The external credit ledger, keyed by `(user_id, path)`.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Whether the user already has an account at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the ledger cannot answer.
    async fn account_exists(&self, user_id: &str, path: &str) -> Result<bool, LedgerError>;

    /// Grant `amount` credits; returns the amount actually granted.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the ledger cannot answer.
    async fn add_credits(&self, user_id: &str, path: &str, amount: i64)
    -> Result<i64, LedgerError>;

    /// Charge `amount` credits.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] on transport failure; insufficient funds is
    /// reported through [`ChargeOutcome`].
    async fn subtract_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<ChargeOutcome, LedgerError>;

    /// Give back `amount` credits after a failed paid operation.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the ledger cannot answer.
    async fn refund_credits(&self, user_id: &str, path: &str, amount: i64)
    -> Result<(), LedgerError>;
}
