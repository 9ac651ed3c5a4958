//! External action interface
//!
//! Wire-facing request/response types and the dispatch from an untyped
//! action request to the typed engine operations. Responses are shaped per
//! session status: the crash point and mine positions are withheld until the
//! session is terminal, so a player can never read the hidden outcome of a
//! round they can still act on.

use crate::engine::{ActionOutcome, GameEngine, SeedReveal};
use crate::errors::EngineError;
use crate::games::{dice, CrashStatus, GameSession, GameType, MinesStatus, Outcome};
use serde::{Deserialize, Serialize};

/// Player action verb.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Single-shot games (dice, plinko): bet and settle in one request.
    Play,
    /// Multi-step games (crash, mines): open a session.
    Start,
    /// Mines: reveal one tile.
    Reveal,
    /// Crash and mines: settle the session as a win.
    Cashout,
    /// Crash: record that the round crashed.
    Crashed,
}

/// One inbound player action. Optional fields are required per
/// (game, action) combination and rejected with a validation error when
/// missing or out of place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub user_id: String,
    pub game_type: GameType,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_seed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_under: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mine_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_index: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u8>,
}

/// Player-visible outcome, shaped per session status. Hidden commitment
/// fields appear only once no further action can be taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum OutcomeView {
    Dice {
        roll: u8,
        target: u8,
        roll_under: bool,
        win: bool,
    },
    Crash {
        status: CrashStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        crash_point: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cashout_multiplier: Option<f64>,
    },
    Mines {
        status: MinesStatus,
        mine_count: u8,
        revealed_tiles: Vec<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hit_tile: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mine_positions: Option<Vec<u8>>,
    },
    Plinko {
        bucket: u8,
        multiplier: f64,
        path: Vec<u8>,
    },
}

impl OutcomeView {
    /// Redact hidden fields for non-terminal sessions.
    pub fn from_session(session: &GameSession) -> Self {
        let terminal = session.is_terminal();
        match &session.outcome {
            Outcome::Dice {
                roll,
                target,
                roll_under,
                win,
            } => OutcomeView::Dice {
                roll: *roll,
                target: *target,
                roll_under: *roll_under,
                win: *win,
            },
            Outcome::Crash {
                crash_point,
                cashout_multiplier,
                status,
            } => OutcomeView::Crash {
                status: *status,
                crash_point: terminal.then_some(*crash_point),
                cashout_multiplier: *cashout_multiplier,
            },
            Outcome::Mines {
                mine_count,
                mine_positions,
                revealed_tiles,
                hit_tile,
                status,
            } => OutcomeView::Mines {
                status: *status,
                mine_count: *mine_count,
                revealed_tiles: revealed_tiles.clone(),
                hit_tile: *hit_tile,
                mine_positions: terminal.then(|| mine_positions.clone()),
            },
            Outcome::Plinko {
                bucket,
                multiplier,
                path,
            } => OutcomeView::Plinko {
                bucket: *bucket,
                multiplier: *multiplier,
                path: path.clone(),
            },
        }
    }
}

/// Result of a processed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub session_id: String,
    pub game_type: GameType,
    pub outcome: OutcomeView,
    /// Present once the session is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
    pub balance: f64,
    pub house_edge: f64,
    pub nonce: u64,
}

impl ActionResponse {
    fn from_outcome(outcome: ActionOutcome) -> Self {
        let terminal = outcome.session.is_terminal();
        Self {
            success: true,
            session_id: outcome.session.id.clone(),
            game_type: outcome.session.game_type,
            outcome: OutcomeView::from_session(&outcome.session),
            payout: terminal.then_some(outcome.session.payout),
            profit_loss: terminal.then_some(outcome.session.profit_loss()),
            balance: outcome.balance,
            house_edge: outcome.house_edge,
            nonce: outcome.session.nonce,
        }
    }
}

impl GameEngine {
    /// Dispatch an untyped action request to the matching engine operation.
    pub async fn handle(&self, request: ActionRequest) -> Result<ActionResponse, EngineError> {
        if request.user_id.is_empty() {
            return Err(EngineError::Validation("user_id must not be empty".into()));
        }
        let outcome = match (request.game_type, request.action) {
            (GameType::Dice, Action::Play) => {
                let params = dice::DiceParams {
                    target: require(request.target, "target")?,
                    roll_under: require(request.roll_under, "roll_under")?,
                };
                self.play_dice(
                    &request.user_id,
                    require(request.bet_amount, "bet_amount")?,
                    params,
                    request.client_seed,
                )
                .await?
            }
            (GameType::Plinko, Action::Play) => {
                self.play_plinko(
                    &request.user_id,
                    require(request.bet_amount, "bet_amount")?,
                    request.rows,
                    request.client_seed,
                )
                .await?
            }
            (GameType::Crash, Action::Start) => {
                self.start_crash(
                    &request.user_id,
                    require(request.bet_amount, "bet_amount")?,
                    request.client_seed,
                )
                .await?
            }
            (GameType::Crash, Action::Cashout) => {
                self.cashout_crash(
                    &request.user_id,
                    &require(request.session_id, "session_id")?,
                    require(request.multiplier, "multiplier")?,
                )
                .await?
            }
            (GameType::Crash, Action::Crashed) => {
                self.mark_crashed(
                    &request.user_id,
                    &require(request.session_id, "session_id")?,
                )
                .await?
            }
            (GameType::Mines, Action::Start) => {
                self.start_mines(
                    &request.user_id,
                    require(request.bet_amount, "bet_amount")?,
                    require(request.mine_count, "mine_count")?,
                    request.client_seed,
                )
                .await?
            }
            (GameType::Mines, Action::Reveal) => {
                self.reveal_tile(
                    &request.user_id,
                    &require(request.session_id, "session_id")?,
                    require(request.tile_index, "tile_index")?,
                )
                .await?
            }
            (GameType::Mines, Action::Cashout) => {
                self.cashout_mines(
                    &request.user_id,
                    &require(request.session_id, "session_id")?,
                )
                .await?
            }
            (GameType::Lottery, _) => {
                return Err(EngineError::Validation(
                    "lottery is settled externally".into(),
                ))
            }
            (game, action) => {
                return Err(EngineError::Validation(format!(
                    "action {:?} is not valid for {}",
                    action, game
                )))
            }
        };
        Ok(ActionResponse::from_outcome(outcome))
    }

    /// Commitment reveal for a terminal session the user owns.
    pub async fn handle_seed_reveal(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SeedReveal, EngineError> {
        self.reveal_server_seed(user_id, session_id).await
    }
}

fn require<T>(field: Option<T>, name: &str) -> Result<T, EngineError> {
    field.ok_or_else(|| EngineError::Validation(format!("missing required field {}", name)))
}
