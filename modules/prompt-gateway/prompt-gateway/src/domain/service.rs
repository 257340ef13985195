//! Domain service for the prompt gateway.
//!
//! Orchestrates prompt resolution, provider selection, metering and
//! continuation sealing. Authentication happens before any of this.

use std::collections::BTreeMap;
use std::sync::Arc;

use prompt_gateway_sdk::{ModelProvider, ModelReply, PromptSpec, PromptVariables, ServiceKind};
use tracing::instrument;

use super::continuation::{Continuation, ContinuationCodec};
use super::error::DomainError;
use super::metering::MeteringOrchestrator;
use super::registry::ProviderRegistry;

/// A finished model exchange ready to hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Sealed continuation token for the next turn.
    pub context: String,
    /// Human-readable answer.
    pub result: String,
}

pub struct Service {
    prompts: BTreeMap<String, PromptSpec>,
    codec: ContinuationCodec,
    metering: MeteringOrchestrator,
    providers: ProviderRegistry,
}

impl Service {
    #[must_use]
    pub fn new(
        prompts: BTreeMap<String, PromptSpec>,
        codec: ContinuationCodec,
        metering: MeteringOrchestrator,
        providers: ProviderRegistry,
    ) -> Self {
        Self {
            prompts,
            codec,
            metering,
            providers,
        }
    }

    pub fn prompts(&self) -> impl Iterator<Item = (&str, &PromptSpec)> {
        self.prompts.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// # Errors
    /// [`DomainError::UnknownPrompt`] if `name` is not configured.
    pub fn prompt(&self, name: &str) -> Result<&PromptSpec, DomainError> {
        self.prompts
            .get(name)
            .ok_or_else(|| DomainError::UnknownPrompt {
                name: name.to_owned(),
            })
    }

    #[must_use]
    pub fn has_provider(&self, service: ServiceKind) -> bool {
        self.providers.get(service).is_some()
    }

    fn provider_for(&self, spec: &PromptSpec) -> Result<Arc<dyn ModelProvider>, DomainError> {
        self.providers
            .get(spec.service)
            .ok_or(DomainError::UnsupportedService {
                service: spec.service,
            })
    }

    /// Keep only the prompt's declared variables, defaulting absent ones to "".
    #[must_use]
    pub fn collect_variables(
        spec: &PromptSpec,
        supplied: &BTreeMap<String, String>,
    ) -> PromptVariables {
        spec.variables
            .iter()
            .map(|name| {
                let value = supplied.get(name).cloned().unwrap_or_default();
                (name.clone(), value)
            })
            .collect()
    }

    /// Open a continuation token and resolve the prompt it names.
    ///
    /// # Errors
    /// [`DomainError::InvalidContinuation`] or [`DomainError::UnknownPrompt`].
    pub fn open_continuation(
        &self,
        token: &str,
    ) -> Result<(Continuation, &PromptSpec), DomainError> {
        let continuation = self
            .codec
            .open(token)
            .map_err(DomainError::InvalidContinuation)?;
        let spec = self.prompt(&continuation.prompt)?;
        Ok((continuation, spec))
    }

    /// Start a new conversation with prompt `name`.
    ///
    /// # Errors
    /// Any [`DomainError`] except `InvalidContinuation`.
    #[instrument(skip_all, fields(prompt = %name, user_id = %user_id))]
    pub async fn start(
        &self,
        user_id: &str,
        name: &str,
        supplied: &BTreeMap<String, String>,
    ) -> Result<Completion, DomainError> {
        let spec = self.prompt(name)?;
        let provider = self.provider_for(spec)?;
        let provider = provider.as_ref();
        let variables = Self::collect_variables(spec, supplied);
        let variables = &variables;

        let reply = self
            .metering
            .execute(
                user_id,
                Some(&spec.cost),
                spec.initial_credit_grant,
                move || provider.start_conversation(spec, variables),
            )
            .await?;

        self.seal(name, &reply)
    }

    /// Resume an opened conversation with the caller's next message.
    ///
    /// Charges the prompt's continuation cost.
    ///
    /// # Errors
    /// Any [`DomainError`] except `InvalidContinuation`.
    #[instrument(skip_all, fields(prompt = %continuation.prompt, user_id = %user_id))]
    pub async fn resume(
        &self,
        user_id: &str,
        continuation: Continuation,
        user_text: &str,
    ) -> Result<Completion, DomainError> {
        let Continuation {
            prompt,
            model_context,
        } = continuation;
        let spec = self.prompt(&prompt)?;
        let provider = self.provider_for(spec)?;
        let provider = provider.as_ref();

        let reply = self
            .metering
            .execute(
                user_id,
                Some(spec.continuation_charge()),
                spec.initial_credit_grant,
                move || provider.continue_conversation(spec, model_context, user_text),
            )
            .await?;

        self.seal(&prompt, &reply)
    }

    fn seal(&self, prompt: &str, reply: &ModelReply) -> Result<Completion, DomainError> {
        let context = self
            .codec
            .seal(prompt, &reply.state)
            .map_err(DomainError::Seal)?;
        Ok(Completion {
            context,
            result: reply.result.clone(),
        })
    }
}
