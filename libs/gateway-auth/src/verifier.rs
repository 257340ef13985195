use std::time::Duration;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use url::Url;

use crate::config_error::ConfigError;
use crate::errors::VerifyError;
use crate::traits::TokenVerifier;

/// Verifies tokens by replaying them to an Identity Provider endpoint.
///
/// Any 2xx answer means "authentic"; the response body is ignored.
#[derive(Debug, Clone)]
pub struct HttpTokenVerifier {
    client: reqwest::Client,
    verification_url: Url,
}

impl HttpTokenVerifier {
    /// # Errors
    /// Returns [`ConfigError::InvalidUrl`] for an unparsable URL and
    /// [`ConfigError::HttpClient`] if the client cannot be built.
    pub fn new(verification_url: &str, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let parsed = Url::parse(verification_url).map_err(|source| ConfigError::InvalidUrl {
            url: verification_url.to_owned(),
            source,
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            verification_url: parsed,
        })
    }

    #[must_use]
    pub fn verification_url(&self) -> &Url {
        &self.verification_url
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<(), VerifyError> {
        let response = self
            .client
            .get(self.verification_url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            tracing::debug!(status = status.as_u16(), "identity provider rejected token");
            Err(VerifyError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
