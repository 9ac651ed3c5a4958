//! Shared game types
//!
//! `GameType`, the per-game outcome union, and the persisted `GameSession`
//! record that every action reads and conditionally updates.

pub mod crash;
pub mod dice;
pub mod mines;
pub mod plinko;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported game types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Crash,
    Dice,
    Mines,
    Plinko,
    /// Recognized for session records; settlement is external and every
    /// engine action rejects it.
    Lottery,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Crash => write!(f, "crash"),
            GameType::Dice => write!(f, "dice"),
            GameType::Mines => write!(f, "mines"),
            GameType::Plinko => write!(f, "plinko"),
            GameType::Lottery => write!(f, "lottery"),
        }
    }
}

/// Crash session status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CrashStatus {
    Active,
    Won,
    Crashed,
}

/// Mines session status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinesStatus {
    InProgress,
    Bust,
    CashedOut,
}

/// Game-specific outcome payload (discriminated union keyed by game).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Outcome {
    Dice {
        /// Displayed roll in [1, 100], always inside the zone matching `win`.
        roll: u8,
        target: u8,
        roll_under: bool,
        win: bool,
    },
    Crash {
        /// Fixed at start; hidden from the player until terminal.
        crash_point: f64,
        /// Multiplier the player cashed out at, when they won.
        cashout_multiplier: Option<f64>,
        status: CrashStatus,
    },
    Mines {
        mine_count: u8,
        /// Fixed at start; hidden from the player until terminal.
        mine_positions: Vec<u8>,
        /// Safely revealed tiles, in reveal order.
        revealed_tiles: Vec<u8>,
        /// Tile shown as the mine that ended the round, when bust.
        hit_tile: Option<u8>,
        status: MinesStatus,
    },
    Plinko {
        /// Resolved bucket index in [0, 16].
        bucket: u8,
        multiplier: f64,
        /// Cosmetic ball-drop path (0 = left, 1 = right per row).
        path: Vec<u8>,
    },
}

impl Outcome {
    /// Whether the session can no longer be acted on.
    pub fn is_terminal(&self) -> bool {
        match self {
            Outcome::Dice { .. } | Outcome::Plinko { .. } => true,
            Outcome::Crash { status, .. } => *status != CrashStatus::Active,
            Outcome::Mines { status, .. } => *status != MinesStatus::InProgress,
        }
    }
}

/// One wagering unit: created at start (or atomically for one-shot games),
/// mutated only by the owner's subsequent actions, immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub user_id: String,
    pub game_type: GameType,
    /// Positive, immutable after creation, debited atomically with creation.
    pub bet_amount: f64,
    /// Hex-encoded 32-byte commitment, fixed at creation, revealed only once
    /// the session is terminal.
    pub server_seed: String,
    pub client_seed: String,
    /// Strictly increasing per (user, game_type); never reused.
    pub nonce: u64,
    pub outcome: Outcome,
    pub payout: f64,
    /// Conditional-update counter; every persisted mutation bumps it.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Profit (positive) or loss (negative) from the player's perspective.
    /// Only meaningful once terminal.
    pub fn profit_loss(&self) -> f64 {
        self.payout - self.bet_amount
    }
}

/// Centralized win/loss inference, consumed uniformly by history and stats
/// collaborators instead of per-game ad hoc checks.
pub fn is_win(game_type: GameType, outcome: &Outcome, payout: f64, bet_amount: f64) -> bool {
    match (game_type, outcome) {
        (GameType::Dice, Outcome::Dice { win, .. }) => *win,
        (GameType::Crash, Outcome::Crash { status, .. }) => *status == CrashStatus::Won,
        (GameType::Mines, Outcome::Mines { status, .. }) => *status == MinesStatus::CashedOut,
        (GameType::Plinko, Outcome::Plinko { .. }) => payout > bet_amount,
        // Mismatched or external (lottery) payloads fall back to the ledger.
        _ => payout > bet_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        let dice = Outcome::Dice {
            roll: 42,
            target: 50,
            roll_under: true,
            win: true,
        };
        assert!(dice.is_terminal());

        let active = Outcome::Crash {
            crash_point: 2.5,
            cashout_multiplier: None,
            status: CrashStatus::Active,
        };
        assert!(!active.is_terminal());

        let won = Outcome::Crash {
            crash_point: 2.5,
            cashout_multiplier: Some(2.0),
            status: CrashStatus::Won,
        };
        assert!(won.is_terminal());

        let in_progress = Outcome::Mines {
            mine_count: 3,
            mine_positions: vec![1, 2, 3],
            revealed_tiles: vec![],
            hit_tile: None,
            status: MinesStatus::InProgress,
        };
        assert!(!in_progress.is_terminal());
    }

    #[test]
    fn test_outcome_serde_tagging() {
        let outcome = Outcome::Plinko {
            bucket: 8,
            multiplier: 0.3,
            path: vec![0, 1, 0],
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["game"], "plinko");
        assert_eq!(json["bucket"], 8);
    }

    #[test]
    fn test_is_win_per_game() {
        let dice_loss = Outcome::Dice {
            roll: 80,
            target: 50,
            roll_under: true,
            win: false,
        };
        assert!(!is_win(GameType::Dice, &dice_loss, 0.0, 10.0));

        let crash_won = Outcome::Crash {
            crash_point: 3.0,
            cashout_multiplier: Some(2.0),
            status: CrashStatus::Won,
        };
        assert!(is_win(GameType::Crash, &crash_won, 20.0, 10.0));

        let mines_bust = Outcome::Mines {
            mine_count: 3,
            mine_positions: vec![0, 1, 2],
            revealed_tiles: vec![5],
            hit_tile: Some(1),
            status: MinesStatus::Bust,
        };
        assert!(!is_win(GameType::Mines, &mines_bust, 0.0, 10.0));

        let plinko = Outcome::Plinko {
            bucket: 0,
            multiplier: 110.0,
            path: vec![],
        };
        assert!(is_win(GameType::Plinko, &plinko, 1100.0, 10.0));
    }

    #[test]
    fn test_profit_loss() {
        let session = GameSession {
            id: "s".into(),
            user_id: "u".into(),
            game_type: GameType::Dice,
            bet_amount: 10.0,
            server_seed: String::new(),
            client_seed: String::new(),
            nonce: 1,
            outcome: Outcome::Dice {
                roll: 10,
                target: 50,
                roll_under: true,
                win: true,
            },
            payout: 20.0,
            version: 1,
            created_at: Utc::now(),
            settled_at: Some(Utc::now()),
        };
        assert_eq!(session.profit_loss(), 10.0);
    }
}
