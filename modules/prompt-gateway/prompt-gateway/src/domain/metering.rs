//! Charge-then-refund-on-failure around a model call.
//!
//! This is a compensating transaction, not a two-phase commit: if the process
//! dies between a successful charge and the refund, the user stays charged.
//! Refund failures are logged with user, path and amount for reconciliation.

use std::future::Future;
use std::sync::Arc;

use prompt_gateway_sdk::{ChargeSpec, CreditLedger, LedgerError, ProviderError};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum MeteringError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct MeteringOrchestrator {
    ledger: Arc<dyn CreditLedger>,
}

impl MeteringOrchestrator {
    #[must_use]
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    /// Run `call` under `charge`.
    ///
    /// - no charge, or a non-positive amount: `call` runs unmetered
    /// - `initial_grant > 0`: first-time users at `charge.path` get the grant
    /// - insufficient funds: `call` never runs
    /// - `call` fails: the same amount is refunded once, best-effort
    ///
    /// # Errors
    /// [`MeteringError::InsufficientFunds`], a ledger transport error before the
    /// call, or the call's own [`ProviderError`].
    #[instrument(
        skip_all,
        fields(user_id = %user_id, path = charge.map_or("", |c| c.path.as_str()))
    )]
    pub async fn execute<T, F, Fut>(
        &self,
        user_id: &str,
        charge: Option<&ChargeSpec>,
        initial_grant: i64,
        call: F,
    ) -> Result<T, MeteringError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, ProviderError>> + Send,
        T: Send,
    {
        let Some(charge) = charge.filter(|c| c.is_billable()) else {
            return Ok(call().await?);
        };

        if initial_grant > 0 {
            self.ensure_account(user_id, &charge.path, initial_grant)
                .await?;
        }

        let outcome = self
            .ledger
            .subtract_credits(user_id, &charge.path, charge.cost)
            .await
            .inspect_err(|e| {
                tracing::error!(amount = charge.cost, error = %e, "failed to charge credits");
            })?;

        if !outcome.sufficient {
            tracing::info!(amount = charge.cost, "insufficient funds");
            return Err(MeteringError::InsufficientFunds);
        }

        match call().await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.refund(user_id, charge).await;
                Err(err.into())
            }
        }
    }

    /// Grant the initial credits if the account does not exist yet.
    ///
    /// A failed existence check is treated as "exists"; a failed grant is fatal.
    async fn ensure_account(
        &self,
        user_id: &str,
        path: &str,
        grant: i64,
    ) -> Result<(), LedgerError> {
        let exists = match self.ledger.account_exists(user_id, path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(error = %e, "account existence check failed; assuming account exists");
                true
            }
        };

        if !exists {
            let granted = self
                .ledger
                .add_credits(user_id, path, grant)
                .await
                .inspect_err(|e| {
                    tracing::error!(amount = grant, error = %e, "failed to grant initial credits");
                })?;
            tracing::info!(granted, "granted initial credits");
        }
        Ok(())
    }

    async fn refund(&self, user_id: &str, charge: &ChargeSpec) {
        if let Err(e) = self
            .ledger
            .refund_credits(user_id, &charge.path, charge.cost)
            .await
        {
            tracing::error!(
                user_id,
                path = %charge.path,
                amount = charge.cost,
                error = %e,
                "refund failed; user remains charged"
            );
        }
    }
}
