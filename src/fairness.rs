//! Fairness Generator
//!
//! Deterministic random-value derivation for provably fair outcomes.
//!
//! ## Commitment scheme
//!
//! 1. **Commit** - A fresh 32-byte server seed is generated at session start
//!    and withheld from the player.
//! 2. **Play** - Every draw is `random(server_seed, client_seed, draw_nonce)`,
//!    a pure function of the committed material.
//! 3. **Reveal** - Once the session is terminal the server seed is disclosed.
//! 4. **Verify** - Anyone can recompute every draw and check the outcome.
//!
//! ## Draw-nonce schedule
//!
//! Games needing several independent draws per round derive each draw nonce
//! from the session's base nonce with a fixed, documented formula — never a
//! fresh random nonce — so every draw stays independently reproducible:
//!
//! - dice: win/lose decision at `nonce`, displayed roll at `nonce + 1000`
//! - mines placement: shuffle step `i` at `nonce * 100 + i`
//! - mines reveal: reveal after `k` prior safe reveals at `nonce * 1000 + k`
//! - crash, plinko: single draw at `nonce`
//!
//! Note that when the house edge forces a loss, the *visible* roll or tile is
//! synthesized to match the decision; the decision itself is still fully
//! reproducible from the revealed seeds.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Client seed used when the caller supplies none.
pub const DEFAULT_CLIENT_SEED: &str = "fairedge-default";

/// Length of the server seed in bytes (hex-encoded to 64 characters).
pub const SERVER_SEED_LEN: usize = 32;

/// Generate a fresh server seed: 32 cryptographically secure random bytes,
/// hex-encoded. Never derived from user input.
pub fn generate_server_seed() -> String {
    let mut bytes = [0u8; SERVER_SEED_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derive a uniform value in [0, 1] from the committed material.
///
/// SHA-256 over `"{server_seed}:{client_seed}:{nonce}"`, first 8 hex
/// characters parsed as u32, divided by `0xFFFFFFFF`. Bit-reproducible:
/// identical inputs always yield the identical float, so any third party can
/// re-derive outcomes after the server seed is revealed.
pub fn random(server_seed: &str, client_seed: &str, nonce: u64) -> f64 {
    let input = format!("{}:{}:{}", server_seed, client_seed, nonce);
    let digest = Sha256::digest(input.as_bytes());
    let hex_digest = hex::encode(digest);
    // First 8 hex chars of a 64-char digest always parse.
    let value = u32::from_str_radix(&hex_digest[..8], 16).unwrap_or(0);
    value as f64 / u32::MAX as f64
}

/// Draw nonce for the dice displayed-roll draw.
pub fn dice_roll_nonce(nonce: u64) -> u64 {
    nonce + 1000
}

/// Draw nonce for mines Fisher-Yates shuffle step `i`.
pub fn mines_shuffle_nonce(nonce: u64, step: usize) -> u64 {
    nonce * 100 + step as u64
}

/// Draw nonce for a mines reveal with `revealed_count` prior safe reveals.
pub fn mines_reveal_nonce(nonce: u64, revealed_count: usize) -> u64 {
    nonce * 1000 + revealed_count as u64
}

/// Map a draw to an index in `[0, len)`. Clamps the `draw == 1.0` edge case
/// (probability 2^-32) so the result is always in range.
pub fn draw_index(draw: f64, len: usize) -> usize {
    ((draw * len as f64) as usize).min(len.saturating_sub(1))
}
