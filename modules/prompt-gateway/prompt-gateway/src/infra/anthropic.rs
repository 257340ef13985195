//! Anthropic Messages API adapter.

use std::time::Duration;

use async_trait::async_trait;
use prompt_gateway_sdk::{
    ConversationState, ModelProvider, ModelReply, PromptSpec, PromptVariables, ProviderError,
    ServiceKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::config::AnthropicConfig;
use crate::domain::template::render;

const API_KEY_HEADER: &str = "x-api-key";
const VERSION_HEADER: &str = "anthropic-version";
const TEXT_BLOCK: &str = "text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request body; also the conversation state carried in continuation tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub temperature: f32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Render the prompt into its first request: system, then initial user, then
/// initial assistant turn, each only when configured.
#[must_use]
pub fn build_request(spec: &PromptSpec, variables: &PromptVariables) -> MessagesRequest {
    let mut messages = Vec::new();
    if let Some(user) = &spec.initial_user {
        messages.push(Message::new(Role::User, render(user, variables)));
    }
    if let Some(agent) = &spec.initial_agent {
        messages.push(Message::new(Role::Assistant, render(agent, variables)));
    }

    MessagesRequest {
        model: spec.model.clone(),
        max_tokens: spec.max_tokens,
        system: spec.system.as_deref().map(|s| render(s, variables)),
        temperature: spec.temperature,
        messages,
    }
}

/// Append one assistant turn holding the first text block; other block types
/// are skipped, and a reply with no text block yields an empty turn.
fn append_reply(request: &mut MessagesRequest, content: &[ContentBlock]) {
    let text = content
        .iter()
        .find(|block| block.kind == TEXT_BLOCK)
        .and_then(|block| block.text.clone())
        .unwrap_or_default();
    request.messages.push(Message::new(Role::Assistant, text));
}

/// Join the trailing run of assistant turns with `\n`.
#[must_use]
pub fn collect_latest_responses(messages: &[Message]) -> String {
    let start = messages
        .iter()
        .rposition(|m| m.role != Role::Assistant)
        .map_or(0, |i| i + 1);

    messages[start..]
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
    api_version: String,
}

impl AnthropicProvider {
    /// # Errors
    /// Returns [`ProviderError::Transport`] if the endpoint does not parse or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &AnthropicConfig) -> Result<Self, ProviderError> {
        Self::new(
            &config.endpoint,
            SecretString::from(config.api_key.expose_secret().to_owned()),
            &config.api_version,
            config.timeout(),
        )
    }

    /// # Errors
    /// Returns [`ProviderError::Transport`] if the endpoint does not parse or the
    /// HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        api_key: SecretString,
        api_version: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ProviderError::Transport(format!("invalid endpoint '{endpoint}': {e}")))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            api_version: api_version.to_owned(),
        })
    }

    #[instrument(skip_all, fields(model = %request.model, turns = request.messages.len()))]
    async fn send(&self, mut request: MessagesRequest) -> Result<ModelReply, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(VERSION_HEADER, &self.api_version)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        // The body is read whatever the status: error responses carry the message.
        let parsed: MessagesResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(ProviderError::Decode(e.to_string())),
        };

        if let Some(error) = parsed.error {
            return Err(ProviderError::Api {
                message: error.message,
            });
        }
        if parsed.content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                stop_reason = parsed.stop_reason.as_deref().unwrap_or(""),
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "anthropic reply received"
            );
        }

        append_reply(&mut request, &parsed.content);
        let result = collect_latest_responses(&request.messages);
        let state =
            serde_json::to_value(&request).map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(ModelReply {
            state: ConversationState(state),
            result,
        })
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn service(&self) -> ServiceKind {
        ServiceKind::Anthropic
    }

    async fn start_conversation(
        &self,
        spec: &PromptSpec,
        variables: &PromptVariables,
    ) -> Result<ModelReply, ProviderError> {
        self.send(build_request(spec, variables)).await
    }

    async fn continue_conversation(
        &self,
        spec: &PromptSpec,
        state: ConversationState,
        user_text: &str,
    ) -> Result<ModelReply, ProviderError> {
        let mut request: MessagesRequest = serde_json::from_value(state.0)
            .map_err(|e| ProviderError::IncompatibleState(e.to_string()))?;

        if request.model != spec.model {
            return Err(ProviderError::IncompatibleState(format!(
                "state was produced by model '{}', prompt uses '{}'",
                request.model, spec.model
            )));
        }

        // Continuation text goes in verbatim, without template substitution.
        request.messages.push(Message::new(Role::User, user_text));
        self.send(request).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use prompt_gateway_sdk::ChargeSpec;
    use serde_json::json;

    fn msg(role: Role, content: &str) -> Message {
        Message::new(role, content)
    }

    fn spec() -> PromptSpec {
        PromptSpec {
            service: ServiceKind::Anthropic,
            model: "claude-3-haiku-20240307".to_owned(),
            system: Some("You write about {{topic}}.".to_owned()),
            max_tokens: 256,
            temperature: 0.3,
            initial_user: Some("Hi, I'm {{name}}".to_owned()),
            initial_agent: Some("Hello {{name}}".to_owned()),
            cost: ChargeSpec {
                path: "p".to_owned(),
                cost: 0,
            },
            continue_cost: None,
            required_scope: "s".to_owned(),
            variables: vec!["name".to_owned(), "topic".to_owned()],
            initial_credit_grant: 0,
        }
    }

    fn vars() -> PromptVariables {
        [("name", "Ann"), ("topic", "cats")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::new(
            &server.url("/v1/messages"),
            SecretString::from("test-key".to_owned()),
            "2023-06-01",
            None,
        )
        .unwrap()
    }

    #[test]
    fn latest_responses_join_trailing_assistant_run() {
        let messages = [
            msg(Role::User, "Hello"),
            msg(Role::Assistant, "Hi"),
            msg(Role::Assistant, "How are you?"),
        ];
        assert_eq!(collect_latest_responses(&messages), "Hi\nHow are you?");
    }

    #[test]
    fn latest_responses_empty_when_user_spoke_last() {
        let messages = [msg(Role::Assistant, "Hi"), msg(Role::User, "Hello")];
        assert_eq!(collect_latest_responses(&messages), "");
    }

    #[test]
    fn latest_responses_only_count_trailing_run() {
        let messages = [
            msg(Role::Assistant, "First"),
            msg(Role::User, "Hi"),
            msg(Role::Assistant, "Second"),
            msg(Role::Assistant, "Third"),
        ];
        assert_eq!(collect_latest_responses(&messages), "Second\nThird");
    }

    #[test]
    fn latest_responses_all_assistant() {
        let messages = [msg(Role::Assistant, "a"), msg(Role::Assistant, "b")];
        assert_eq!(collect_latest_responses(&messages), "a\nb");
        assert_eq!(collect_latest_responses(&[]), "");
    }

    #[test]
    fn build_request_renders_turns_in_order() {
        let request = build_request(&spec(), &vars());

        assert_eq!(request.system.as_deref(), Some("You write about cats."));
        assert_eq!(
            request.messages,
            vec![
                msg(Role::User, "Hi, I'm Ann"),
                msg(Role::Assistant, "Hello Ann"),
            ]
        );
        assert_eq!(request.max_tokens, 256);
    }

    #[test]
    fn build_request_without_optional_turns() {
        let mut s = spec();
        s.initial_user = None;
        s.initial_agent = None;

        let request = build_request(&s, &vars());
        assert!(request.messages.is_empty());

        let body = serde_json::to_value(&request).unwrap();
        s.system = None;
        let no_system = serde_json::to_value(build_request(&s, &vars())).unwrap();
        assert!(body.get("system").is_some());
        assert!(no_system.get("system").is_none());
    }

    #[test]
    fn non_text_blocks_are_skipped() {
        let mut request = build_request(&spec(), &vars());
        let content = vec![
            ContentBlock {
                kind: "tool_use".to_owned(),
                text: None,
            },
            ContentBlock {
                kind: "text".to_owned(),
                text: Some("answer".to_owned()),
            },
            ContentBlock {
                kind: "text".to_owned(),
                text: Some("ignored".to_owned()),
            },
        ];

        append_reply(&mut request, &content);
        assert_eq!(request.messages.last(), Some(&msg(Role::Assistant, "answer")));
    }

    #[tokio::test]
    async fn start_sends_headers_and_appends_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/messages")
                    .header("x-api-key", "test-key")
                    .header("anthropic-version", "2023-06-01")
                    .header("content-type", "application/json");
                then.status(200).json_body(json!({
                    "id": "msg_1",
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "text", "text": "Cats are great."}],
                    "model": "claude-3-haiku-20240307",
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 12, "output_tokens": 5}
                }));
            })
            .await;

        let reply = provider(&server)
            .start_conversation(&spec(), &vars())
            .await
            .unwrap();

        // The initial assistant turn and the reply form one trailing run.
        assert_eq!(reply.result, "Hello Ann\nCats are great.");
        let state: MessagesRequest = serde_json::from_value(reply.state.0).unwrap();
        assert_eq!(state.messages.len(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_typed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(529).json_body(json!({
                    "type": "error",
                    "error": {"type": "overloaded_error", "message": "Overloaded"}
                }));
            })
            .await;

        let err = provider(&server)
            .start_conversation(&spec(), &vars())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProviderError::Api {
                message: "Overloaded".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn empty_content_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200).json_body(json!({"content": []}));
            })
            .await;

        let err = provider(&server)
            .start_conversation(&spec(), &vars())
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::EmptyResponse);
    }

    #[tokio::test]
    async fn unreadable_error_body_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(502).body("<html>bad gateway</html>");
            })
            .await;

        let err = provider(&server)
            .start_conversation(&spec(), &vars())
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::Status { status: 502 });
    }

    #[tokio::test]
    async fn continue_appends_raw_user_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200)
                    .json_body(json!({"content": [{"type": "text", "text": "Sure."}]}));
            })
            .await;

        let mut state = build_request(&spec(), &vars());
        state.messages.push(msg(Role::Assistant, "first answer"));
        let state = ConversationState(serde_json::to_value(&state).unwrap());

        let reply = provider(&server)
            .continue_conversation(&spec(), state, "more about {{topic}}")
            .await
            .unwrap();

        let state: MessagesRequest = serde_json::from_value(reply.state.0).unwrap();
        let n = state.messages.len();
        assert_eq!(state.messages[n - 2], msg(Role::User, "more about {{topic}}"));
        assert_eq!(state.messages[n - 1], msg(Role::Assistant, "Sure."));
        assert_eq!(reply.result, "Sure.");
    }

    #[tokio::test]
    async fn continue_rejects_foreign_state_without_calling() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200);
            })
            .await;
        let p = provider(&server);

        let mut other = spec();
        other.model = "another-model".to_owned();
        let state = ConversationState(
            serde_json::to_value(build_request(&other, &vars())).unwrap(),
        );
        let err = p
            .continue_conversation(&spec(), state, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::IncompatibleState(_)));

        let err = p
            .continue_conversation(&spec(), ConversationState(json!({"foo": 1})), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::IncompatibleState(_)));

        assert_eq!(mock.hits_async().await, 0);
    }
}
