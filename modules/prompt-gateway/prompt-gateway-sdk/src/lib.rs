//! Prompt Gateway SDK
//!
//! This crate provides the contract shared by the `prompt_gateway` module and the
//! collaborators it calls out to:
//!
//! - [`ModelProvider`] - capability trait implemented once per model vendor
//! - [`CreditLedger`] - capability trait for the external credit ledger
//! - [`PromptSpec`], [`ChargeSpec`], [`ServiceKind`] - prompt configuration models
//! - [`ConversationState`], [`ModelReply`] - normalized model exchange
//! - [`ProviderError`], [`LedgerError`] - error types
//!
//! ## Usage
//!
//! ```ignore
//! use prompt_gateway_sdk::{ModelProvider, PromptVariables};
//!
//! let reply = provider.start_conversation(&spec, &variables).await?;
//! let next = provider
//!     .continue_conversation(&spec, reply.state, "tell me more")
//!     .await?;
//! println!("{}", next.result);
//! ```

pub mod api;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use api::{CreditLedger, ModelProvider};
pub use error::{LedgerError, ProviderError};
pub use models::{
    ChargeOutcome, ChargeSpec, ConversationState, ModelReply, PromptSpec, PromptVariables,
    ServiceKind,
};
