//! Ledger Guard
//!
//! Every wager flows through here: bet validation, the atomic debit that
//! accompanies session creation, the credit at settlement, and the refund
//! that reverses a debit when a downstream step fails. Each balance mutation
//! appends one audit entry pairing it with the triggering session.

use crate::config::BetConfig;
use crate::errors::EngineError;
use crate::store::{BalanceStore, StoreError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of balance mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Debit,
    Credit,
    Refund,
}

/// One append-only audit record per balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: String,
    pub session_id: String,
    pub kind: LedgerEntryKind,
    pub amount: f64,
    pub balance_after: f64,
    pub at: DateTime<Utc>,
}

/// Guards all balance mutations around a wager.
pub struct LedgerGuard {
    balances: Arc<dyn BalanceStore>,
    bets: BetConfig,
    log: DashMap<String, Vec<LedgerEntry>>,
}

impl LedgerGuard {
    pub fn new(balances: Arc<dyn BalanceStore>, bets: BetConfig) -> Self {
        Self {
            balances,
            bets,
            log: DashMap::new(),
        }
    }

    /// Validate a bet amount against shape and configured bounds. Runs
    /// before any reservation.
    pub fn validate_bet(&self, amount: f64) -> Result<(), EngineError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EngineError::Validation(format!(
                "bet amount must be a positive number, got {}",
                amount
            )));
        }
        if amount < self.bets.min_bet || amount > self.bets.max_bet {
            return Err(EngineError::Validation(format!(
                "bet amount {} outside allowed range [{}, {}]",
                amount, self.bets.min_bet, self.bets.max_bet
            )));
        }
        Ok(())
    }

    /// Validate and debit the bet. Fails without side effects when the
    /// balance is insufficient. Returns the new balance.
    pub async fn reserve(
        &self,
        user_id: &str,
        amount: f64,
        session_id: &str,
    ) -> Result<f64, EngineError> {
        self.validate_bet(amount)?;
        let balance_after = match self.balances.debit(user_id, amount).await {
            Ok(b) => b,
            Err(StoreError::InsufficientBalance { balance, required }) => {
                return Err(EngineError::InsufficientFunds { balance, required })
            }
            Err(e) => return Err(EngineError::Storage(e.to_string())),
        };
        self.append(user_id, session_id, LedgerEntryKind::Debit, amount, balance_after);
        tracing::debug!(user_id, session_id, amount, balance_after, "reserved bet");
        Ok(balance_after)
    }

    /// Credit a settlement amount. A zero-payout settlement is recorded in
    /// the audit log without touching the balance store.
    pub async fn settle(
        &self,
        user_id: &str,
        amount: f64,
        session_id: &str,
    ) -> Result<f64, EngineError> {
        let balance_after = if amount > 0.0 {
            self.balances
                .credit(user_id, amount)
                .await
                .map_err(|e| EngineError::Storage(e.to_string()))?
        } else {
            self.balances
                .balance(user_id)
                .await
                .map_err(|e| EngineError::Storage(e.to_string()))?
        };
        self.append(user_id, session_id, LedgerEntryKind::Credit, amount, balance_after);
        tracing::debug!(user_id, session_id, amount, balance_after, "settled");
        Ok(balance_after)
    }

    /// Reverse a reserve after a downstream failure. The debit is never
    /// silently dropped.
    pub async fn refund(
        &self,
        user_id: &str,
        amount: f64,
        session_id: &str,
    ) -> Result<f64, EngineError> {
        let balance_after = self
            .balances
            .credit(user_id, amount)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        self.append(user_id, session_id, LedgerEntryKind::Refund, amount, balance_after);
        tracing::warn!(user_id, session_id, amount, "refunded bet after downstream failure");
        Ok(balance_after)
    }

    pub async fn balance(&self, user_id: &str) -> Result<f64, EngineError> {
        self.balances
            .balance(user_id)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// Audit entries for a user, in append order.
    pub fn entries(&self, user_id: &str) -> Vec<LedgerEntry> {
        self.log.get(user_id).map(|e| e.clone()).unwrap_or_default()
    }

    fn append(
        &self,
        user_id: &str,
        session_id: &str,
        kind: LedgerEntryKind,
        amount: f64,
        balance_after: f64,
    ) {
        self.log
            .entry(user_id.to_string())
            .or_default()
            .push(LedgerEntry {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                kind,
                amount,
                balance_after,
                at: Utc::now(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_ledger(store: &MemoryStore) -> LedgerGuard {
        LedgerGuard::new(Arc::new(store.clone()), BetConfig::default())
    }

    #[tokio::test]
    async fn test_reserve_debits_exactly_once() {
        let store = MemoryStore::new();
        store.set_balance("alice", 100.0);
        let ledger = test_ledger(&store);

        let balance = ledger.reserve("alice", 10.0, "s1").await.expect("reserve");
        assert_eq!(balance, 90.0);
        assert_eq!(ledger.balance("alice").await.expect("balance"), 90.0);
    }

    #[tokio::test]
    async fn test_reserve_rejects_bad_amounts_before_mutation() {
        let store = MemoryStore::new();
        store.set_balance("bob", 100.0);
        let ledger = test_ledger(&store);

        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY, 0.001, 1_000_000.0] {
            assert!(
                matches!(
                    ledger.reserve("bob", bad, "s1").await,
                    Err(EngineError::Validation(_))
                ),
                "amount {} accepted",
                bad
            );
        }
        assert_eq!(ledger.balance("bob").await.expect("balance"), 100.0);
        assert!(ledger.entries("bob").is_empty());
    }

    #[tokio::test]
    async fn test_reserve_insufficient_funds() {
        let store = MemoryStore::new();
        store.set_balance("carol", 5.0);
        let ledger = test_ledger(&store);

        let result = ledger.reserve("carol", 10.0, "s1").await;
        assert!(matches!(result, Err(EngineError::InsufficientFunds { .. })));
        assert_eq!(ledger.balance("carol").await.expect("balance"), 5.0);
    }

    #[tokio::test]
    async fn test_refund_restores_balance() {
        let store = MemoryStore::new();
        store.set_balance("dave", 100.0);
        let ledger = test_ledger(&store);

        ledger.reserve("dave", 25.0, "s1").await.expect("reserve");
        ledger.refund("dave", 25.0, "s1").await.expect("refund");
        assert_eq!(ledger.balance("dave").await.expect("balance"), 100.0);

        let entries = ledger.entries("dave");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, LedgerEntryKind::Debit);
        assert_eq!(entries[1].kind, LedgerEntryKind::Refund);
    }

    #[tokio::test]
    async fn test_settle_records_zero_payout() {
        let store = MemoryStore::new();
        store.set_balance("erin", 90.0);
        let ledger = test_ledger(&store);

        let balance = ledger.settle("erin", 0.0, "s1").await.expect("settle");
        assert_eq!(balance, 90.0);
        let entries = ledger.entries("erin");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LedgerEntryKind::Credit);
        assert_eq!(entries[0].amount, 0.0);
    }

    #[tokio::test]
    async fn test_audit_entries_pair_session() {
        let store = MemoryStore::new();
        store.set_balance("frank", 100.0);
        let ledger = test_ledger(&store);

        ledger.reserve("frank", 10.0, "s1").await.expect("reserve");
        ledger.settle("frank", 20.0, "s1").await.expect("settle");

        let entries = ledger.entries("frank");
        assert!(entries.iter().all(|e| e.session_id == "s1"));
        assert_eq!(entries.last().expect("entry").balance_after, 110.0);
    }
}
