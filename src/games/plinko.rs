//! Plinko resolver
//!
//! Fixed 16-row board with 17 payout buckets, symmetric around the
//! lowest-multiplier center bucket. The house edge shrinks the allowed
//! bucket range symmetrically toward the center; at edge 1 only the center
//! bucket can be hit. The ball-drop path is cosmetic: it is derived to be
//! consistent with the resolved bucket but carries no probability weight.

use crate::errors::EngineError;
use crate::fairness;

/// Number of peg rows (and path steps).
pub const ROWS: usize = 16;

/// Bucket count (ROWS + 1).
pub const BUCKET_COUNT: usize = 17;

/// Index of the center (lowest-multiplier) bucket.
pub const CENTER_BUCKET: usize = 8;

/// Payout multipliers per bucket, symmetric around the center.
pub const PAYOUT_TABLE: [f64; BUCKET_COUNT] = [
    110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0, 110.0,
];

/// Resolved plinko round.
#[derive(Debug, Clone, PartialEq)]
pub struct PlinkoResolution {
    pub bucket: u8,
    pub multiplier: f64,
    /// One step per row: 0 = left, 1 = right. Sum of steps equals the bucket
    /// index, so the displayed drop lands in the resolved bucket.
    pub path: Vec<u8>,
}

/// Row-count validation. The board is fixed at 16 rows; the parameter exists
/// so callers sending an explicit row count get a clean rejection instead of
/// a silently different board.
pub fn validate_rows(rows: Option<u8>) -> Result<(), EngineError> {
    match rows {
        None => Ok(()),
        Some(r) if r as usize == ROWS => Ok(()),
        Some(r) => Err(EngineError::Validation(format!(
            "unsupported row count {}, only {} rows supported",
            r, ROWS
        ))),
    }
}

/// Resolve one plinko drop.
pub fn resolve(
    house_edge: f64,
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
) -> PlinkoResolution {
    let bucket = if house_edge >= 1.0 {
        CENTER_BUCKET
    } else {
        let max_distance = (CENTER_BUCKET as f64 * (1.0 - house_edge)) as usize;
        let lo = CENTER_BUCKET - max_distance;
        let range = 2 * max_distance + 1;
        let draw = fairness::random(server_seed, client_seed, nonce);
        lo + fairness::draw_index(draw, range)
    };

    PlinkoResolution {
        bucket: bucket as u8,
        multiplier: PAYOUT_TABLE[bucket],
        path: path_for_bucket(bucket, server_seed, client_seed, nonce),
    }
}

/// Build a cosmetic left/right path landing in `bucket`: exactly `bucket`
/// right-steps over 16 rows, their positions shuffled deterministically from
/// the same committed material.
fn path_for_bucket(bucket: usize, server_seed: &str, client_seed: &str, nonce: u64) -> Vec<u8> {
    let mut path: Vec<u8> = (0..ROWS).map(|i| u8::from(i < bucket)).collect();
    for i in (1..ROWS).rev() {
        let draw = fairness::random(server_seed, client_seed, fairness::mines_shuffle_nonce(nonce, i));
        let j = fairness::draw_index(draw, i + 1);
        path.swap(i, j);
    }
    path
}
