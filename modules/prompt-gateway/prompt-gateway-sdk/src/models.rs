//! Domain models for the prompt gateway.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Values for a prompt's declared variables, keyed by variable name.
pub type PromptVariables = BTreeMap<String, String>;

/// Model vendor a prompt is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ServiceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger account and amount charged for one model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChargeSpec {
    /// Ledger account path the charge is booked against.
    #[serde(default)]
    pub path: String,
    /// Credits charged per call; zero means free.
    pub cost: i64,
}

impl ChargeSpec {
    /// Only positive amounts touch the ledger.
    #[must_use]
    pub fn is_billable(&self) -> bool {
        self.cost > 0
    }
}

/// Static configuration of one named prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptSpec {
    pub service: ServiceKind,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_agent: Option<String>,
    pub cost: ChargeSpec,
    /// Charge for continuations; falls back to `cost` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_cost: Option<ChargeSpec>,
    pub required_scope: String,
    #[serde(default)]
    pub variables: Vec<String>,
    /// Credits granted the first time a user reaches this prompt's ledger path.
    #[serde(default)]
    pub initial_credit_grant: i64,
}

impl PromptSpec {
    /// The charge applied when a conversation is resumed.
    #[must_use]
    pub fn continuation_charge(&self) -> &ChargeSpec {
        self.continue_cost.as_ref().unwrap_or(&self.cost)
    }
}

/// Provider-specific conversation history, opaque to everything but the
/// adapter that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationState(pub serde_json::Value);

/// Normalized result of one model exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    /// Full history including the assistant turn just received.
    pub state: ConversationState,
    /// Trailing assistant turns joined by a line break.
    pub result: String,
}

/// Answer of a ledger charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub sufficient: bool,
    pub charged: i64,
}
