//! Dice resolver
//!
//! Roll-under / roll-over over the integer range [1, 100]. The house edge
//! scales the win probability, not the payout multiplier: the win/lose
//! decision is drawn against `base_win_probability * (1 - house_edge)`, then
//! a second, independent draw places the displayed roll uniformly inside
//! whichever zone matches the decision. The roll shown can therefore never
//! contradict the settlement.

use crate::errors::EngineError;
use crate::fairness;
use serde::{Deserialize, Serialize};

/// Caller-supplied dice parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiceParams {
    /// Target in [1, 99].
    pub target: u8,
    /// true = win on rolls [1, target]; false = win on [target+1, 100].
    pub roll_under: bool,
}

/// Resolved dice round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiceResolution {
    pub win: bool,
    /// Displayed roll in [1, 100], inside the zone matching `win`.
    pub roll: u8,
    /// Payout multiplier applied on a win (1 / base_win_probability).
    pub multiplier: f64,
}

/// Width of the win zone for the given parameters.
fn win_zone_width(params: DiceParams) -> u8 {
    if params.roll_under {
        params.target
    } else {
        100 - params.target
    }
}

/// Fair win probability implied by the zone width alone.
pub fn base_win_probability(params: DiceParams) -> f64 {
    win_zone_width(params) as f64 / 100.0
}

/// Payout multiplier for a win. Independent of house edge.
pub fn multiplier(params: DiceParams) -> f64 {
    100.0 / (base_win_probability(params) * 100.0)
}

pub fn validate(params: DiceParams) -> Result<(), EngineError> {
    if !(1..=99).contains(&params.target) {
        return Err(EngineError::Validation(format!(
            "dice target must be in [1,99], got {}",
            params.target
        )));
    }
    Ok(())
}

/// Resolve one dice round. Validates before any draw.
pub fn resolve(
    params: DiceParams,
    house_edge: f64,
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
) -> Result<DiceResolution, EngineError> {
    validate(params)?;

    let base = base_win_probability(params);
    let adjusted = base * (1.0 - house_edge);

    // Draw 1: the settlement decision.
    let decision = fairness::random(server_seed, client_seed, nonce);
    let win = decision < adjusted;

    // Draw 2: place the displayed roll inside the zone matching the decision.
    let placement = fairness::random(server_seed, client_seed, fairness::dice_roll_nonce(nonce));
    let width = win_zone_width(params);
    let roll = if win == params.roll_under {
        // Low zone [1, target] (win when rolling under, loss when over).
        let zone = if params.roll_under { width } else { 100 - width };
        1 + fairness::draw_index(placement, zone as usize) as u8
    } else {
        // High zone [target+1, 100].
        let zone = if params.roll_under { 100 - width } else { width };
        params.target + 1 + fairness::draw_index(placement, zone as usize) as u8
    };

    Ok(DiceResolution {
        win,
        roll,
        multiplier: multiplier(params),
    })
}
