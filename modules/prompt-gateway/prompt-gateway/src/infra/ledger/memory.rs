//! Process-local credit ledger for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use prompt_gateway_sdk::{ChargeOutcome, CreditLedger, LedgerError};

/// A ledger call as observed by [`InMemoryCreditLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Exists { user_id: String, path: String },
    Add { user_id: String, path: String, amount: i64 },
    Subtract { user_id: String, path: String, amount: i64 },
    Refund { user_id: String, path: String, amount: i64 },
}

#[derive(Debug, Default)]
struct State {
    balances: HashMap<(String, String), i64>,
    operations: Option<Vec<LedgerOp>>,
}

impl State {
    fn record(&mut self, op: impl FnOnce() -> LedgerOp) {
        if let Some(operations) = self.operations.as_mut() {
            operations.push(op());
        }
    }
}

/// Balances per `(user_id, path)` behind a mutex.
///
/// Accounts touched by a charge before they exist are opened with
/// `initial_balance`. Ledger calls are kept for inspection only when built
/// with [`InMemoryCreditLedger::recording`].
#[derive(Debug, Default)]
pub struct InMemoryCreditLedger {
    initial_balance: i64,
    state: Mutex<State>,
}

impl InMemoryCreditLedger {
    #[must_use]
    pub fn new(initial_balance: i64) -> Self {
        Self {
            initial_balance,
            state: Mutex::new(State::default()),
        }
    }

    /// Like [`InMemoryCreditLedger::new`], but every call is appended to
    /// [`InMemoryCreditLedger::operations`].
    #[must_use]
    pub fn recording(initial_balance: i64) -> Self {
        Self {
            initial_balance,
            state: Mutex::new(State {
                operations: Some(Vec::new()),
                ..State::default()
            }),
        }
    }

    /// Open an account with the initial balance unless it already exists.
    pub fn open_account(&self, user_id: &str, path: &str) {
        self.state
            .lock()
            .balances
            .entry(key(user_id, path))
            .or_insert(self.initial_balance);
    }

    #[must_use]
    pub fn balance(&self, user_id: &str, path: &str) -> Option<i64> {
        self.state.lock().balances.get(&key(user_id, path)).copied()
    }

    #[must_use]
    pub fn operations(&self) -> Vec<LedgerOp> {
        self.state.lock().operations.clone().unwrap_or_default()
    }
}

fn key(user_id: &str, path: &str) -> (String, String) {
    (user_id.to_owned(), path.to_owned())
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn account_exists(&self, user_id: &str, path: &str) -> Result<bool, LedgerError> {
        let mut state = self.state.lock();
        state.record(|| LedgerOp::Exists {
            user_id: user_id.to_owned(),
            path: path.to_owned(),
        });
        Ok(state.balances.contains_key(&key(user_id, path)))
    }

    async fn add_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<i64, LedgerError> {
        let mut state = self.state.lock();
        state.record(|| LedgerOp::Add {
            user_id: user_id.to_owned(),
            path: path.to_owned(),
            amount,
        });
        *state.balances.entry(key(user_id, path)).or_insert(0) += amount;
        Ok(amount)
    }

    async fn subtract_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<ChargeOutcome, LedgerError> {
        let mut state = self.state.lock();
        state.record(|| LedgerOp::Subtract {
            user_id: user_id.to_owned(),
            path: path.to_owned(),
            amount,
        });

        let balance = state
            .balances
            .entry(key(user_id, path))
            .or_insert(self.initial_balance);
        if *balance < amount {
            return Ok(ChargeOutcome {
                sufficient: false,
                charged: 0,
            });
        }
        *balance -= amount;
        Ok(ChargeOutcome {
            sufficient: true,
            charged: amount,
        })
    }

    async fn refund_credits(
        &self,
        user_id: &str,
        path: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        state.record(|| LedgerOp::Refund {
            user_id: user_id.to_owned(),
            path: path.to_owned(),
            amount,
        });
        *state.balances.entry(key(user_id, path)).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn charge_opens_account_with_initial_balance() {
        let ledger = InMemoryCreditLedger::new(10);

        let outcome = ledger.subtract_credits("u", "p", 4).await.unwrap();

        assert!(outcome.sufficient);
        assert_eq!(outcome.charged, 4);
        assert_eq!(ledger.balance("u", "p"), Some(6));
    }

    #[tokio::test]
    async fn overdraft_is_refused_without_change() {
        let ledger = InMemoryCreditLedger::new(3);

        let outcome = ledger.subtract_credits("u", "p", 4).await.unwrap();

        assert!(!outcome.sufficient);
        assert_eq!(ledger.balance("u", "p"), Some(3));
    }

    #[tokio::test]
    async fn calls_are_logged_only_when_recording() {
        let plain = InMemoryCreditLedger::new(10);
        let recording = InMemoryCreditLedger::recording(10);

        for ledger in [&plain, &recording] {
            ledger.subtract_credits("u", "p", 4).await.unwrap();
            ledger.refund_credits("u", "p", 4).await.unwrap();
        }

        assert!(plain.operations().is_empty());
        assert_eq!(
            recording.operations(),
            vec![
                LedgerOp::Subtract {
                    user_id: "u".to_owned(),
                    path: "p".to_owned(),
                    amount: 4,
                },
                LedgerOp::Refund {
                    user_id: "u".to_owned(),
                    path: "p".to_owned(),
                    amount: 4,
                },
            ]
        );
        assert_eq!(plain.balance("u", "p"), Some(10));
    }

    #[tokio::test]
    async fn accounts_are_keyed_by_user_and_path() {
        let ledger = InMemoryCreditLedger::new(0);
        ledger.add_credits("u", "a", 5).await.unwrap();

        assert!(ledger.account_exists("u", "a").await.unwrap());
        assert!(!ledger.account_exists("u", "b").await.unwrap());
        assert!(!ledger.account_exists("v", "a").await.unwrap());
    }
}
