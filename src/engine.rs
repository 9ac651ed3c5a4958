//! Session State Machines
//!
//! One async operation per inbound action. Every operation follows the same
//! discipline: rate-limit, validate inputs before any mutation, reserve
//! funds, resolve against persisted session state, and finalize with a
//! conditional update so that of two concurrent conflicting actions exactly
//! one succeeds. The persisted store is the source of truth; nothing round-
//! scoped lives in engine memory.

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::fairness;
use crate::games::{
    crash, dice, mines, plinko, CrashStatus, GameSession, GameType, MinesStatus, Outcome,
};
use crate::ledger::LedgerGuard;
use crate::ratelimit::RateLimiter;
use crate::store::{BalanceStore, SessionStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a successfully processed action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub session: GameSession,
    /// User balance after the action.
    pub balance: f64,
    /// House edge applied to this game.
    pub house_edge: f64,
}

/// Commitment reveal for a terminal session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SeedReveal {
    pub session_id: String,
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

pub struct GameEngine {
    config: EngineConfig,
    sessions: Arc<dyn SessionStore>,
    balances: Arc<dyn BalanceStore>,
    ledger: LedgerGuard,
    limiter: RateLimiter,
}

impl GameEngine {
    pub fn new(
        config: EngineConfig,
        sessions: Arc<dyn SessionStore>,
        balances: Arc<dyn BalanceStore>,
    ) -> Self {
        let ledger = LedgerGuard::new(balances.clone(), config.bets.clone());
        let limiter = RateLimiter::new(config.rate_limit.clone());
        Self {
            config,
            sessions,
            balances,
            ledger,
            limiter,
        }
    }

    pub fn ledger(&self) -> &LedgerGuard {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Single-shot games
    // ------------------------------------------------------------------

    /// Dice: one request computes the outcome, mutates the balance, and
    /// persists a terminal session.
    pub async fn play_dice(
        &self,
        user_id: &str,
        bet_amount: f64,
        params: dice::DiceParams,
        client_seed: Option<String>,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;
        dice::validate(params)?;
        self.ledger.validate_bet(bet_amount)?;

        let house_edge = self.config.house_edge.for_game(GameType::Dice);
        let (id, server_seed, client_seed, nonce) =
            self.new_round(user_id, GameType::Dice, client_seed).await?;

        self.ledger.reserve(user_id, bet_amount, &id).await?;

        let resolution = match dice::resolve(params, house_edge, &server_seed, &client_seed, nonce)
        {
            Ok(r) => r,
            Err(e) => {
                self.ledger.refund(user_id, bet_amount, &id).await?;
                return Err(e);
            }
        };
        let payout = if resolution.win {
            bet_amount * resolution.multiplier
        } else {
            0.0
        };

        let session = GameSession {
            id: id.clone(),
            user_id: user_id.to_string(),
            game_type: GameType::Dice,
            bet_amount,
            server_seed,
            client_seed,
            nonce,
            outcome: Outcome::Dice {
                roll: resolution.roll,
                target: params.target,
                roll_under: params.roll_under,
                win: resolution.win,
            },
            payout,
            version: 1,
            created_at: Utc::now(),
            settled_at: Some(Utc::now()),
        };

        self.persist_single_shot(session, user_id, bet_amount, payout, house_edge)
            .await
    }

    /// Plinko: single-shot like dice.
    pub async fn play_plinko(
        &self,
        user_id: &str,
        bet_amount: f64,
        rows: Option<u8>,
        client_seed: Option<String>,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;
        plinko::validate_rows(rows)?;
        self.ledger.validate_bet(bet_amount)?;

        let house_edge = self.config.house_edge.for_game(GameType::Plinko);
        let (id, server_seed, client_seed, nonce) = self
            .new_round(user_id, GameType::Plinko, client_seed)
            .await?;

        self.ledger.reserve(user_id, bet_amount, &id).await?;

        let resolution = plinko::resolve(house_edge, &server_seed, &client_seed, nonce);
        let payout = bet_amount * resolution.multiplier;

        let session = GameSession {
            id: id.clone(),
            user_id: user_id.to_string(),
            game_type: GameType::Plinko,
            bet_amount,
            server_seed,
            client_seed,
            nonce,
            outcome: Outcome::Plinko {
                bucket: resolution.bucket,
                multiplier: resolution.multiplier,
                path: resolution.path,
            },
            payout,
            version: 1,
            created_at: Utc::now(),
            settled_at: Some(Utc::now()),
        };

        self.persist_single_shot(session, user_id, bet_amount, payout, house_edge)
            .await
    }

    // ------------------------------------------------------------------
    // Crash
    // ------------------------------------------------------------------

    /// Start a crash round: debit the bet and persist an active session with
    /// a hidden, fixed crash point.
    pub async fn start_crash(
        &self,
        user_id: &str,
        bet_amount: f64,
        client_seed: Option<String>,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;
        self.ledger.validate_bet(bet_amount)?;
        self.reject_duplicate_active(user_id, GameType::Crash).await?;

        let house_edge = self.config.house_edge.for_game(GameType::Crash);
        let (id, server_seed, client_seed, nonce) =
            self.new_round(user_id, GameType::Crash, client_seed).await?;

        let balance = self.ledger.reserve(user_id, bet_amount, &id).await?;

        let crash_point = crash::crash_point(house_edge, &server_seed, &client_seed, nonce);
        let session = GameSession {
            id: id.clone(),
            user_id: user_id.to_string(),
            game_type: GameType::Crash,
            bet_amount,
            server_seed,
            client_seed,
            nonce,
            outcome: Outcome::Crash {
                crash_point,
                cashout_multiplier: None,
                status: CrashStatus::Active,
            },
            payout: 0.0,
            version: 1,
            created_at: Utc::now(),
            settled_at: None,
        };

        if let Err(e) = self.sessions.create_session(session.clone()).await {
            // The debit must not be silently dropped.
            self.ledger.refund(user_id, bet_amount, &id).await?;
            return Err(EngineError::Storage(e.to_string()));
        }

        Ok(ActionOutcome {
            session,
            balance,
            house_edge,
        })
    }

    /// Cash out an active crash round. Wins only when the requested
    /// multiplier does not exceed the hidden crash point; otherwise the
    /// round factually crashed first and settles with no credit.
    pub async fn cashout_crash(
        &self,
        user_id: &str,
        session_id: &str,
        multiplier: f64,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;
        crash::validate_cashout_multiplier(multiplier)?;

        let session = self.load_owned(session_id, user_id).await?;
        let crash_point = match &session.outcome {
            Outcome::Crash {
                crash_point,
                status: CrashStatus::Active,
                ..
            } => *crash_point,
            Outcome::Crash { .. } => {
                return Err(EngineError::State("crash session already ended".into()))
            }
            _ => return Err(EngineError::State("not a crash session".into())),
        };

        let won = crash::cashout_wins(multiplier, crash_point);
        let payout = if won { session.bet_amount * multiplier } else { 0.0 };
        let (status, cashout_multiplier) = if won {
            (CrashStatus::Won, Some(multiplier))
        } else {
            (CrashStatus::Crashed, None)
        };

        let mut updated = session.clone();
        updated.outcome = Outcome::Crash {
            crash_point,
            cashout_multiplier,
            status,
        };
        updated.payout = payout;
        updated.settled_at = Some(Utc::now());

        self.finalize(updated, session.version, payout).await
    }

    /// Record that an active crash round crashed (client-reported or
    /// timeout-equivalent). The bet was already debited; no credit.
    pub async fn mark_crashed(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;

        let session = self.load_owned(session_id, user_id).await?;
        let crash_point = match &session.outcome {
            Outcome::Crash {
                crash_point,
                status: CrashStatus::Active,
                ..
            } => *crash_point,
            Outcome::Crash { .. } => {
                return Err(EngineError::State("crash session already ended".into()))
            }
            _ => return Err(EngineError::State("not a crash session".into())),
        };

        let mut updated = session.clone();
        updated.outcome = Outcome::Crash {
            crash_point,
            cashout_multiplier: None,
            status: CrashStatus::Crashed,
        };
        updated.settled_at = Some(Utc::now());

        self.finalize(updated, session.version, 0.0).await
    }

    // ------------------------------------------------------------------
    // Mines
    // ------------------------------------------------------------------

    /// Start a mines round: debit the bet, fix the mine positions for the
    /// whole round, persist an in-progress session.
    pub async fn start_mines(
        &self,
        user_id: &str,
        bet_amount: f64,
        mine_count: u8,
        client_seed: Option<String>,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;
        mines::validate_mine_count(mine_count)?;
        self.ledger.validate_bet(bet_amount)?;
        self.reject_duplicate_active(user_id, GameType::Mines).await?;

        let house_edge = self.config.house_edge.for_game(GameType::Mines);
        let (id, server_seed, client_seed, nonce) =
            self.new_round(user_id, GameType::Mines, client_seed).await?;

        let balance = self.ledger.reserve(user_id, bet_amount, &id).await?;

        let mine_positions = match mines::place_mines(mine_count, &server_seed, &client_seed, nonce)
        {
            Ok(m) => m,
            Err(e) => {
                self.ledger.refund(user_id, bet_amount, &id).await?;
                return Err(e);
            }
        };

        let session = GameSession {
            id: id.clone(),
            user_id: user_id.to_string(),
            game_type: GameType::Mines,
            bet_amount,
            server_seed,
            client_seed,
            nonce,
            outcome: Outcome::Mines {
                mine_count,
                mine_positions,
                revealed_tiles: Vec::new(),
                hit_tile: None,
                status: MinesStatus::InProgress,
            },
            payout: 0.0,
            version: 1,
            created_at: Utc::now(),
            settled_at: None,
        };

        if let Err(e) = self.sessions.create_session(session.clone()).await {
            self.ledger.refund(user_id, bet_amount, &id).await?;
            return Err(EngineError::Storage(e.to_string()));
        }

        Ok(ActionOutcome {
            session,
            balance,
            house_edge,
        })
    }

    /// Reveal one tile of an in-progress mines round. Either busts the round
    /// or appends to the revealed list and stays in progress.
    pub async fn reveal_tile(
        &self,
        user_id: &str,
        session_id: &str,
        tile: u8,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;
        mines::validate_tile(tile)?;

        let session = self.load_owned(session_id, user_id).await?;
        let (mine_count, mine_positions, revealed_tiles) = match &session.outcome {
            Outcome::Mines {
                mine_count,
                mine_positions,
                revealed_tiles,
                status: MinesStatus::InProgress,
                ..
            } => (*mine_count, mine_positions.clone(), revealed_tiles.clone()),
            Outcome::Mines { .. } => {
                return Err(EngineError::State("mines session already ended".into()))
            }
            _ => return Err(EngineError::State("not a mines session".into())),
        };

        if revealed_tiles.contains(&tile) {
            return Err(EngineError::State(format!("tile {} already revealed", tile)));
        }

        let house_edge = self.config.house_edge.for_game(GameType::Mines);
        let resolution = mines::resolve_reveal(
            tile,
            &mine_positions,
            &revealed_tiles,
            house_edge,
            &session.server_seed,
            &session.client_seed,
            session.nonce,
            revealed_tiles.len(),
        )?;

        let mut updated = session.clone();
        match resolution {
            mines::RevealResolution::Mine { hit_tile } => {
                updated.outcome = Outcome::Mines {
                    mine_count,
                    mine_positions,
                    revealed_tiles,
                    hit_tile: Some(hit_tile),
                    status: MinesStatus::Bust,
                };
                updated.settled_at = Some(Utc::now());
                self.finalize(updated, session.version, 0.0).await
            }
            mines::RevealResolution::Safe => {
                let mut revealed = revealed_tiles;
                revealed.push(tile);
                updated.outcome = Outcome::Mines {
                    mine_count,
                    mine_positions,
                    revealed_tiles: revealed,
                    hit_tile: None,
                    status: MinesStatus::InProgress,
                };
                let persisted = self
                    .sessions
                    .update_session(updated, session.version)
                    .await
                    .map_err(map_update_err)?;
                let balance = self.ledger.balance(user_id).await?;
                Ok(ActionOutcome {
                    session: persisted,
                    balance,
                    house_edge,
                })
            }
        }
    }

    /// Cash out an in-progress mines round. Legal only with at least one
    /// safe reveal.
    pub async fn cashout_mines(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<ActionOutcome, EngineError> {
        self.limiter.check(user_id)?;

        let session = self.load_owned(session_id, user_id).await?;
        let (mine_count, mine_positions, revealed_tiles) = match &session.outcome {
            Outcome::Mines {
                mine_count,
                mine_positions,
                revealed_tiles,
                status: MinesStatus::InProgress,
                ..
            } => (*mine_count, mine_positions.clone(), revealed_tiles.clone()),
            Outcome::Mines { .. } => {
                return Err(EngineError::State("mines session already ended".into()))
            }
            _ => return Err(EngineError::State("not a mines session".into())),
        };

        if revealed_tiles.is_empty() {
            return Err(EngineError::State(
                "cannot cash out before any safe reveal".into(),
            ));
        }

        let multiplier = mines::multiplier(revealed_tiles.len(), mine_count);
        let payout = session.bet_amount * multiplier;

        let mut updated = session.clone();
        updated.outcome = Outcome::Mines {
            mine_count,
            mine_positions,
            revealed_tiles,
            hit_tile: None,
            status: MinesStatus::CashedOut,
        };
        updated.payout = payout;
        updated.settled_at = Some(Utc::now());

        self.finalize(updated, session.version, payout).await
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// Commitment reveal: the server seed is disclosed only once the session
    /// is terminal, so any third party can recompute every draw.
    pub async fn reveal_server_seed(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SeedReveal, EngineError> {
        let session = self.load_owned(session_id, user_id).await?;
        if !session.is_terminal() {
            return Err(EngineError::State(
                "server seed is revealed only after the session ends".into(),
            ));
        }
        Ok(SeedReveal {
            session_id: session.id,
            server_seed: session.server_seed,
            client_seed: session.client_seed,
            nonce: session.nonce,
        })
    }

    /// Fetch a session for its owner (hidden-field shaping is the caller's
    /// concern).
    pub async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<GameSession, EngineError> {
        self.load_owned(session_id, user_id).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Allocate the committed material for a new round: session id, fresh
    /// server seed, effective client seed, and the next per-(user, game)
    /// nonce.
    async fn new_round(
        &self,
        user_id: &str,
        game_type: GameType,
        client_seed: Option<String>,
    ) -> Result<(String, String, String, u64), EngineError> {
        let id = Uuid::new_v4().to_string();
        let server_seed = fairness::generate_server_seed();
        let client_seed = match client_seed {
            Some(s) if !s.is_empty() => s,
            _ => fairness::DEFAULT_CLIENT_SEED.to_string(),
        };
        let nonce = self
            .balances
            .next_nonce(user_id, game_type)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok((id, server_seed, client_seed, nonce))
    }

    /// Exactly one active session per (user, game) for multi-step games.
    async fn reject_duplicate_active(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> Result<(), EngineError> {
        let active = self
            .sessions
            .find_active_session(user_id, game_type)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        if let Some(existing) = active {
            return Err(EngineError::Validation(format!(
                "{} session {} is still active",
                game_type, existing.id
            )));
        }
        Ok(())
    }

    async fn load_owned(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<GameSession, EngineError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?
            .ok_or_else(|| EngineError::NotFound(session_id.to_string()))?;
        if session.user_id != user_id {
            return Err(EngineError::Authorization(
                "session belongs to another user".into(),
            ));
        }
        Ok(session)
    }

    /// Persist a one-shot terminal session and settle its payout; refunds
    /// the debit when persistence fails.
    async fn persist_single_shot(
        &self,
        session: GameSession,
        user_id: &str,
        bet_amount: f64,
        payout: f64,
        house_edge: f64,
    ) -> Result<ActionOutcome, EngineError> {
        if let Err(e) = self.sessions.create_session(session.clone()).await {
            self.ledger.refund(user_id, bet_amount, &session.id).await?;
            return Err(EngineError::Storage(e.to_string()));
        }
        let balance = self.settle_claimed(&session, payout).await?;
        Ok(ActionOutcome {
            session,
            balance,
            house_edge,
        })
    }

    /// Claim a terminal transition via conditional update, then settle. The
    /// CAS guarantees at-most-once settlement under duplicate requests; a
    /// credit failure after a successful claim is logged for reconciliation.
    async fn finalize(
        &self,
        updated: GameSession,
        expected_version: u64,
        payout: f64,
    ) -> Result<ActionOutcome, EngineError> {
        let persisted = self
            .sessions
            .update_session(updated, expected_version)
            .await
            .map_err(map_update_err)?;
        let balance = self.settle_claimed(&persisted, payout).await?;
        let house_edge = self.config.house_edge.for_game(persisted.game_type);
        Ok(ActionOutcome {
            session: persisted,
            balance,
            house_edge,
        })
    }

    async fn settle_claimed(
        &self,
        session: &GameSession,
        payout: f64,
    ) -> Result<f64, EngineError> {
        match self.ledger.settle(&session.user_id, payout, &session.id).await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    user_id = %session.user_id,
                    payout,
                    "settlement credit failed after session was finalized; needs reconciliation: {}",
                    e
                );
                Err(e)
            }
        }
    }
}

fn map_update_err(e: StoreError) -> EngineError {
    match e {
        StoreError::VersionConflict(id) => {
            EngineError::State(format!("session {} was updated concurrently", id))
        }
        StoreError::SessionNotFound(id) => EngineError::NotFound(id),
        other => EngineError::Storage(other.to_string()),
    }
}
