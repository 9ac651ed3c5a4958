//! Crash resolver
//!
//! The crash point is drawn once at session start, fixed for the whole round,
//! and hidden from the player until the session is terminal. Every cash-out
//! request is validated against it. The house edge shrinks the upper end of
//! the crash-point range: at edge 1 the round always crashes at 1.00x.

use crate::errors::EngineError;
use crate::fairness;

/// Maximum crash multiplier at zero house edge.
pub const MAX_MULTIPLIER: f64 = 5.0;

/// Upper bound of the crash-point range under the given house edge.
pub fn effective_max_multiplier(house_edge: f64) -> f64 {
    1.0 + (MAX_MULTIPLIER - 1.0) * (1.0 - house_edge)
}

/// Draw the round's crash point: linear map of one draw into
/// [1.00, effective_max], floored to two decimals, minimum 1.00.
pub fn crash_point(house_edge: f64, server_seed: &str, client_seed: &str, nonce: u64) -> f64 {
    let draw = fairness::random(server_seed, client_seed, nonce);
    let max = effective_max_multiplier(house_edge);
    let raw = 1.0 + draw * (max - 1.0);
    ((raw * 100.0).floor() / 100.0).max(1.0)
}

/// Whether a cash-out at `multiplier` beats the round's crash point.
pub fn cashout_wins(multiplier: f64, crash_point: f64) -> bool {
    multiplier <= crash_point
}

/// Validate a requested cash-out multiplier before consulting the crash
/// point.
pub fn validate_cashout_multiplier(multiplier: f64) -> Result<(), EngineError> {
    if !multiplier.is_finite() || multiplier < 1.0 || multiplier > MAX_MULTIPLIER {
        return Err(EngineError::Validation(format!(
            "cashout multiplier must be in [1.00, {:.2}], got {}",
            MAX_MULTIPLIER, multiplier
        )));
    }
    Ok(())
}
