//! REST DTOs for the prompt gateway.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::service::Completion;

/// Body of every successful prompt or continuation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Continuation token for the next turn.
    pub context: String,
    pub result: String,
}

impl From<Completion> for CompletionResponse {
    fn from(c: Completion) -> Self {
        Self {
            context: c.context,
            result: c.result,
        }
    }
}

/// Form body of `POST /v1/continue`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContinueForm {
    #[serde(rename = "CONTEXT")]
    pub context: Option<String>,
    #[serde(rename = "USER_TEXT")]
    pub user_text: Option<String>,
}

/// Name of the prompt a `/v1/prompt/{name}` route serves; set per route.
#[derive(Debug, Clone)]
pub struct PromptName(pub Arc<str>);
