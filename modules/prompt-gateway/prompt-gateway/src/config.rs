//! Prompt gateway configuration.
//!
//! Built once at startup and shared read-only through `Arc`.

use std::collections::BTreeMap;
use std::time::Duration;

use prompt_gateway_sdk::{ChargeSpec, PromptSpec};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::continuation::KEY_LEN;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Root configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub continuation: ContinuationConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

/// Identity Provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub verification_url: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContinuationConfig {
    /// AES-256 key, exactly 32 bytes.
    pub key: SecretString,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum LedgerConfig {
    Http {
        base_url: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Process-local balances; development only.
    Memory {
        #[serde(default)]
        initial_balance: i64,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    pub api_key: SecretString,
    #[serde(default = "default_anthropic_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_anthropic_version")]
    pub api_version: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_anthropic_endpoint() -> String {
    DEFAULT_ANTHROPIC_ENDPOINT.to_owned()
}

fn default_anthropic_version() -> String {
    DEFAULT_ANTHROPIC_VERSION.to_owned()
}

/// Allowed CORS origins; empty selects the permissive default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("continuation.key must be exactly {KEY_LEN} bytes, got {len}")]
    KeyLength { len: usize },

    #[error("auth.verification_url is required")]
    MissingVerificationUrl,

    #[error("ledger.base_url is required")]
    MissingLedgerUrl,

    #[error("prompt '{prompt}': {reason}")]
    InvalidPrompt { prompt: String, reason: String },

    #[error("cors.allowed_origins must list explicit origins, got '*'")]
    WildcardOrigin,
}

impl ConfigError {
    fn prompt(prompt: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPrompt {
            prompt: prompt.to_owned(),
            reason: reason.into(),
        }
    }
}

impl GatewayConfig {
    /// Check everything that would otherwise fail on first use.
    ///
    /// # Errors
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key_len = self.continuation.key.expose_secret().len();
        if key_len != KEY_LEN {
            return Err(ConfigError::KeyLength { len: key_len });
        }
        if self.auth.verification_url.trim().is_empty() {
            return Err(ConfigError::MissingVerificationUrl);
        }
        if let LedgerConfig::Http { base_url, .. } = &self.ledger
            && base_url.trim().is_empty()
        {
            return Err(ConfigError::MissingLedgerUrl);
        }
        if self.cors.allowed_origins.iter().any(|o| o.trim() == "*") {
            return Err(ConfigError::WildcardOrigin);
        }
        for (name, spec) in &self.prompts {
            validate_prompt(name, spec)?;
        }
        Ok(())
    }

    /// Copy of the configuration safe to print: secrets are replaced.
    #[must_use]
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "server": self.server,
            "logging": self.logging,
            "auth": self.auth,
            "continuation": { "key": "[REDACTED]" },
            "ledger": self.ledger,
            "providers": {
                "anthropic": self.providers.anthropic.as_ref().map(|a| serde_json::json!({
                    "api_key": "[REDACTED]",
                    "endpoint": a.endpoint,
                    "api_version": a.api_version,
                    "timeout_ms": a.timeout_ms,
                })),
            },
            "cors": self.cors,
            "prompts": self.prompts,
        })
    }
}

impl AuthConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl AnthropicConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Rules every prompt declaration must satisfy.
///
/// # Errors
/// Returns [`ConfigError::InvalidPrompt`] naming the prompt and the rule.
pub fn validate_prompt(name: &str, spec: &PromptSpec) -> Result<(), ConfigError> {
    if !is_valid_prompt_name(name) {
        return Err(ConfigError::prompt(
            name,
            "name may only contain ASCII letters, digits, '-', '_' and '.'",
        ));
    }
    if spec.model.trim().is_empty() {
        return Err(ConfigError::prompt(name, "model is required"));
    }
    if spec.max_tokens == 0 {
        return Err(ConfigError::prompt(name, "max_tokens must be greater than 0"));
    }
    if !(0.0..=1.0).contains(&spec.temperature) {
        return Err(ConfigError::prompt(
            name,
            "temperature must be between 0.0 and 1.0",
        ));
    }
    validate_charge(name, "cost", &spec.cost)?;
    if let Some(continue_cost) = &spec.continue_cost {
        validate_charge(name, "continue_cost", continue_cost)?;
    }
    if spec.system.is_none() && spec.initial_user.is_none() {
        return Err(ConfigError::prompt(
            name,
            "system or initial_user is required",
        ));
    }
    if spec.required_scope.trim().is_empty() {
        return Err(ConfigError::prompt(name, "required_scope is required"));
    }
    if spec.initial_credit_grant < 0 {
        return Err(ConfigError::prompt(
            name,
            "initial_credit_grant must not be negative",
        ));
    }
    Ok(())
}

/// Prompt names become a URL path segment.
fn is_valid_prompt_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn validate_charge(name: &str, field: &str, charge: &ChargeSpec) -> Result<(), ConfigError> {
    if charge.cost < 0 {
        return Err(ConfigError::prompt(
            name,
            format!("{field}.cost must not be negative"),
        ));
    }
    if charge.is_billable() && charge.path.trim().is_empty() {
        return Err(ConfigError::prompt(
            name,
            format!("{field}.path is required when {field}.cost is positive"),
        ));
    }
    Ok(())
}
