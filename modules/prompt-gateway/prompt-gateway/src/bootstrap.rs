//! Wiring from [`GatewayConfig`] to a ready-to-serve [`Router`].

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use gateway_auth::{Authenticator, HttpTokenVerifier, TokenVerifier};
use prompt_gateway_sdk::{CreditLedger, LedgerError, ProviderError};
use secrecy::ExposeSecret;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::api::rest::cors::build_cors_layer;
use crate::api::rest::routes::register_routes;
use crate::config::{ConfigError, GatewayConfig, LedgerConfig};
use crate::domain::continuation::{ContinuationCodec, CryptoEnvelope, EnvelopeError};
use crate::domain::metering::MeteringOrchestrator;
use crate::domain::registry::ProviderRegistry;
use crate::domain::service::Service;
use crate::infra::anthropic::AnthropicProvider;
use crate::infra::ledger::{HttpCreditLedger, InMemoryCreditLedger};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("continuation key rejected: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("identity provider client: {0}")]
    Verifier(#[from] gateway_auth::ConfigError),

    #[error("credit ledger client: {0}")]
    Ledger(#[from] LedgerError),

    #[error("model provider client: {0}")]
    Provider(#[from] ProviderError),
}

/// External systems the gateway talks to.
pub struct Collaborators {
    pub verifier: Arc<dyn TokenVerifier>,
    pub ledger: Arc<dyn CreditLedger>,
    pub providers: ProviderRegistry,
}

impl Collaborators {
    /// Build the HTTP clients described by `config`.
    ///
    /// # Errors
    /// Returns [`BootstrapError`] when a URL or client setting is unusable.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, BootstrapError> {
        let verifier =
            HttpTokenVerifier::new(&config.auth.verification_url, config.auth.timeout())?;

        let ledger: Arc<dyn CreditLedger> = match &config.ledger {
            LedgerConfig::Http {
                base_url,
                timeout_ms,
            } => Arc::new(HttpCreditLedger::new(
                base_url,
                timeout_ms.map(Duration::from_millis),
            )?),
            LedgerConfig::Memory { initial_balance } => {
                tracing::warn!("using in-memory credit ledger; balances are lost on restart");
                Arc::new(InMemoryCreditLedger::new(*initial_balance))
            }
        };

        let mut providers = ProviderRegistry::new();
        if let Some(anthropic) = &config.providers.anthropic {
            providers = providers.with(Arc::new(AnthropicProvider::from_config(anthropic)?));
        }

        Ok(Self {
            verifier: Arc::new(verifier),
            ledger,
            providers,
        })
    }
}

/// Validate `config` and build the gateway router with real clients.
///
/// # Errors
/// Returns [`BootstrapError`] on invalid configuration or client setup.
pub fn build_router(config: &GatewayConfig) -> Result<Router, BootstrapError> {
    config.validate()?;
    let collaborators = Collaborators::from_config(config)?;
    build_router_with(config, collaborators)
}

/// Same as [`build_router`] but with caller-supplied collaborators.
///
/// # Errors
/// Returns [`BootstrapError`] on invalid configuration.
pub fn build_router_with(
    config: &GatewayConfig,
    collaborators: Collaborators,
) -> Result<Router, BootstrapError> {
    config.validate()?;

    let Collaborators {
        verifier,
        ledger,
        providers,
    } = collaborators;

    let envelope = CryptoEnvelope::new(config.continuation.key.expose_secret().as_bytes())?;
    let service = Arc::new(Service::new(
        config.prompts.clone(),
        ContinuationCodec::new(envelope),
        MeteringOrchestrator::new(ledger),
        providers,
    ));

    for (name, spec) in service.prompts() {
        if !service.has_provider(spec.service) {
            tracing::warn!(
                prompt = name,
                service = %spec.service,
                "no adapter configured; route will answer 501"
            );
        }
    }

    let authenticator = Authenticator::new(verifier);
    let router = register_routes(service, authenticator)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors));

    tracing::info!(prompts = config.prompts.len(), "prompt gateway router ready");
    Ok(router)
}
