//! Storage boundary
//!
//! The engine persists all round state through these traits; the production
//! backend is a relational store reachable through simple CRUD (an external
//! collaborator). `MemoryStore` is the reference implementation used by the
//! test suite and defines the required atomicity semantics: session updates
//! are compare-and-set on a version counter, balance debits are conditional
//! read-modify-writes.

use crate::games::{GameSession, GameType};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Errors surfaced by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// The stored session changed since it was read. Exactly one of two
    /// concurrent conflicting transitions sees this.
    #[error("version conflict on session {0}")]
    VersionConflict(String),

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: f64, required: f64 },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Session persistence with conditional updates.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: GameSession) -> Result<(), StoreError>;

    async fn get_session(&self, id: &str) -> Result<Option<GameSession>, StoreError>;

    /// Persist `session` only if the stored version still equals
    /// `expected_version`; the persisted copy gets `expected_version + 1`.
    /// Returns the persisted session.
    async fn update_session(
        &self,
        session: GameSession,
        expected_version: u64,
    ) -> Result<GameSession, StoreError>;

    /// The user's non-terminal session for a game, if any. Used to enforce
    /// the one-active-session-per-(user, game) invariant for multi-step
    /// games.
    async fn find_active_session(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> Result<Option<GameSession>, StoreError>;

    async fn delete_session(&self, id: &str) -> Result<(), StoreError>;
}

/// Balance and nonce persistence.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn balance(&self, user_id: &str) -> Result<f64, StoreError>;

    /// Conditionally subtract `amount`; fails with `InsufficientBalance`
    /// without mutating when the balance is too low. Returns the new
    /// balance.
    async fn debit(&self, user_id: &str, amount: f64) -> Result<f64, StoreError>;

    /// Add `amount` to the balance. Returns the new balance.
    async fn credit(&self, user_id: &str, amount: f64) -> Result<f64, StoreError>;

    /// Atomically increment and return the next nonce for (user, game).
    /// Strictly increasing; never reused, even across sessions.
    async fn next_nonce(&self, user_id: &str, game_type: GameType) -> Result<u64, StoreError>;
}

/// In-memory store backed by sharded concurrent maps. Mutations run under
/// the owning shard lock, which gives the conditional-update semantics the
/// traits require.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<DashMap<String, GameSession>>,
    balances: Arc<DashMap<String, f64>>,
    nonces: Arc<DashMap<(String, GameType), u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user balance (test setup).
    pub fn set_balance(&self, user_id: &str, amount: f64) {
        self.balances.insert(user_id.to_string(), amount);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: GameSession) -> Result<(), StoreError> {
        if self.sessions.contains_key(&session.id) {
            return Err(StoreError::Backend(format!(
                "duplicate session id {}",
                session.id
            )));
        }
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<GameSession>, StoreError> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn update_session(
        &self,
        mut session: GameSession,
        expected_version: u64,
    ) -> Result<GameSession, StoreError> {
        let mut entry = self
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::SessionNotFound(session.id.clone()))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict(session.id.clone()));
        }
        session.version = expected_version + 1;
        *entry = session.clone();
        Ok(session)
    }

    async fn find_active_session(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> Result<Option<GameSession>, StoreError> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.game_type == game_type && !s.is_terminal())
            .map(|s| s.clone()))
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn balance(&self, user_id: &str) -> Result<f64, StoreError> {
        Ok(self.balances.get(user_id).map(|b| *b).unwrap_or(0.0))
    }

    async fn debit(&self, user_id: &str, amount: f64) -> Result<f64, StoreError> {
        let mut entry = self.balances.entry(user_id.to_string()).or_insert(0.0);
        if *entry < amount {
            return Err(StoreError::InsufficientBalance {
                balance: *entry,
                required: amount,
            });
        }
        *entry -= amount;
        Ok(*entry)
    }

    async fn credit(&self, user_id: &str, amount: f64) -> Result<f64, StoreError> {
        let mut entry = self.balances.entry(user_id.to_string()).or_insert(0.0);
        *entry += amount;
        Ok(*entry)
    }

    async fn next_nonce(&self, user_id: &str, game_type: GameType) -> Result<u64, StoreError> {
        let mut entry = self
            .nonces
            .entry((user_id.to_string(), game_type))
            .or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}
