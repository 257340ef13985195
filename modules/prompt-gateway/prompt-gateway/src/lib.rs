// Clippy allows for v1 implementation
#![allow(clippy::doc_markdown)] // Vendor and header names without backticks

//! Prompt Gateway Module Implementation
//!
//! Exposes statically configured prompts as metered, authenticated HTTP routes.
//!
//! ## Architecture
//!
//! ```text
//!              HTTP client
//!                   │
//!                   ▼  POST /v1/prompt/{name}, POST /v1/continue
//! ┌─────────────────────────────────────────┐
//! │  REST API  (scope guard, form parsing)  │
//! └─────────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │  Service                                │
//! │   - ContinuationCodec (open / seal)     │
//! │   - MeteringOrchestrator (charge/refund)│
//! │   - ProviderRegistry                    │
//! └─────────────────────────────────────────┘
//!          │                     │
//!          ▼                     ▼
//!   dyn CreditLedger      dyn ModelProvider
//!   (HTTP / memory)       (Anthropic)
//! ```
//!
//! The contract types live in `prompt-gateway-sdk` and are re-exported here.

// === PUBLIC API (from SDK) ===
pub use prompt_gateway_sdk::{
    ChargeOutcome, ChargeSpec, ConversationState, CreditLedger, LedgerError, ModelProvider,
    ModelReply, PromptSpec, PromptVariables, ProviderError, ServiceKind,
};

pub mod config;
pub use config::{ConfigError, GatewayConfig};

pub mod bootstrap;
pub use bootstrap::{BootstrapError, Collaborators, build_router, build_router_with};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
