//! JSON-over-HTTP client for the external credit ledger service.

use std::time::Duration;

use async_trait::async_trait;
use prompt_gateway_sdk::{ChargeOutcome, CreditLedger, LedgerError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize)]
struct LedgerRequest<'a> {
    user_id: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
}

#[derive(Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Deserialize)]
struct AddResponse {
    granted: i64,
}

#[derive(Deserialize)]
struct RefundResponse {}

/// Talks to the ledger at `base_url`:
///
/// | Operation | Endpoint | Response |
/// |---|---|---|
/// | account exists | `POST accounts/exists` | `{exists}` |
/// | add | `POST credits/add` | `{granted}` |
/// | subtract | `POST credits/subtract` | `{sufficient, charged}` |
/// | refund | `POST credits/refund` | `{}` |
#[derive(Debug, Clone)]
pub struct HttpCreditLedger {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCreditLedger {
    /// # Errors
    /// Returns an error if `base_url` does not parse or the client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, LedgerError> {
        // A trailing slash makes `join` append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| LedgerError::Transport(format!("invalid ledger url '{base_url}': {e}")))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    async fn post<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &LedgerRequest<'_>,
    ) -> Result<R, LedgerError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CreditLedger for HttpCreditLedger {
    async fn account_exists(&self, user_id: &str, path: &str) -> Result<bool, LedgerError> {
        let body = LedgerRequest {
            user_id,
            path,
            amount: None,
        };
        let r: ExistsResponse = self.post("accounts/exists", &body).await?;
        Ok(r.exists)
    }

    async fn add_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<i64, LedgerError> {
        let body = LedgerRequest {
            user_id,
            path,
            amount: Some(amount),
        };
        let r: AddResponse = self.post("credits/add", &body).await?;
        Ok(r.granted)
    }

    async fn subtract_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<ChargeOutcome, LedgerError> {
        let body = LedgerRequest {
            user_id,
            path,
            amount: Some(amount),
        };
        self.post("credits/subtract", &body).await
    }

    async fn refund_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        let body = LedgerRequest {
            user_id,
            path,
            amount: Some(amount),
        };
        let _: RefundResponse = self.post("credits/refund", &body).await?;
        Ok(())
    }
}
