//! Mines resolver
//!
//! 25-tile grid. Mine positions are fixed once at session start via a seeded
//! Fisher-Yates shuffle, so the set never changes mid-round. The house edge
//! acts per reveal: an independent draw may force the reveal into an
//! unrevealed mine (the clicked tile itself when it is a mine), which biases
//! outcomes per step without ever changing the number of mines on the grid.

use crate::errors::EngineError;
use crate::fairness;

/// Total tiles on the grid.
pub const GRID_SIZE: usize = 25;

/// Cap on the cumulative safe-reveal multiplier.
pub const MAX_MULTIPLIER: f64 = 5.0;

/// Result of resolving one reveal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealResolution {
    Safe,
    /// Round ends; the given tile is shown as the mine that was hit.
    Mine { hit_tile: u8 },
}

pub fn validate_mine_count(mine_count: u8) -> Result<(), EngineError> {
    if !(1..=24).contains(&mine_count) {
        return Err(EngineError::Validation(format!(
            "mine count must be in [1,24], got {}",
            mine_count
        )));
    }
    Ok(())
}

pub fn validate_tile(tile: u8) -> Result<(), EngineError> {
    if tile as usize >= GRID_SIZE {
        return Err(EngineError::Validation(format!(
            "tile index must be in [0,24], got {}",
            tile
        )));
    }
    Ok(())
}

/// Place `mine_count` mines with a seeded Fisher-Yates shuffle of the tile
/// indices. The swap index for shuffle step `i` comes from the draw at
/// `nonce * 100 + i`, so the full placement is reproducible from the seeds.
pub fn place_mines(
    mine_count: u8,
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
) -> Result<Vec<u8>, EngineError> {
    validate_mine_count(mine_count)?;

    let mut tiles: Vec<u8> = (0..GRID_SIZE as u8).collect();
    for i in (1..GRID_SIZE).rev() {
        let draw = fairness::random(server_seed, client_seed, fairness::mines_shuffle_nonce(nonce, i));
        let j = fairness::draw_index(draw, i + 1);
        tiles.swap(i, j);
    }

    let mut mines = tiles[..mine_count as usize].to_vec();
    mines.sort_unstable();
    Ok(mines)
}

/// Resolve a reveal of `tile` given the fixed mine set and the tiles already
/// revealed safely. `revealed_count` is the number of prior safe reveals and
/// seeds the per-reveal draw.
pub fn resolve_reveal(
    tile: u8,
    mines: &[u8],
    revealed: &[u8],
    house_edge: f64,
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    revealed_count: usize,
) -> Result<RevealResolution, EngineError> {
    validate_tile(tile)?;

    let draw = fairness::random(
        server_seed,
        client_seed,
        fairness::mines_reveal_nonce(nonce, revealed_count),
    );

    let forced = house_edge >= 1.0 || draw < house_edge;
    if forced {
        // Prefer the clicked tile when it is itself a mine; otherwise show
        // the first mine that has not been revealed yet. The mine set always
        // contains at least one unrevealed mine because safe reveals never
        // touch mines.
        let hit_tile = if mines.contains(&tile) {
            tile
        } else {
            *mines
                .iter()
                .find(|m| !revealed.contains(m))
                .ok_or_else(|| EngineError::State("no unrevealed mine to resolve against".into()))?
        };
        return Ok(RevealResolution::Mine { hit_tile });
    }

    if mines.contains(&tile) {
        Ok(RevealResolution::Mine { hit_tile: tile })
    } else {
        Ok(RevealResolution::Safe)
    }
}

/// Cumulative multiplier after `revealed_count` safe reveals:
/// product of (25-i)/(25-mine_count-i), capped at 5x.
pub fn multiplier(revealed_count: usize, mine_count: u8) -> f64 {
    let mut m = 1.0;
    for i in 0..revealed_count {
        let total = (GRID_SIZE - i) as f64;
        let safe = (GRID_SIZE - mine_count as usize - i) as f64;
        if safe <= 0.0 {
            return MAX_MULTIPLIER;
        }
        m *= total / safe;
        if m >= MAX_MULTIPLIER {
            return MAX_MULTIPLIER;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::generate_server_seed;

    #[test]
    fn test_parameter_validation() {
        assert!(validate_mine_count(0).is_err());
        assert!(validate_mine_count(25).is_err());
        assert!(validate_mine_count(1).is_ok());
        assert!(validate_mine_count(24).is_ok());
        assert!(validate_tile(25).is_err());
        assert!(validate_tile(24).is_ok());
    }

    #[test]
    fn test_placement_exact_count_and_range() {
        let seed = generate_server_seed();
        for mine_count in [1u8, 3, 12, 24] {
            let mines = place_mines(mine_count, &seed, "placement", 7).expect("place");
            assert_eq!(mines.len(), mine_count as usize);
            let mut unique = mines.clone();
            unique.dedup();
            assert_eq!(unique.len(), mines.len(), "duplicate mine positions");
            assert!(mines.iter().all(|&m| (m as usize) < GRID_SIZE));
        }
    }

    #[test]
    fn test_placement_deterministic() {
        let a = place_mines(5, "seed", "client", 11).expect("place");
        let b = place_mines(5, "seed", "client", 11).expect("place");
        assert_eq!(a, b);
        let c = place_mines(5, "seed", "client", 12).expect("place");
        assert_ne!(a, c, "different nonce should reshuffle");
    }

    #[test]
    fn test_placement_covers_all_tiles() {
        // Over many rounds every tile should be a mine sometimes.
        let seed = generate_server_seed();
        let mut seen = [false; GRID_SIZE];
        for nonce in 0..500 {
            for m in place_mines(3, &seed, "coverage", nonce).expect("place") {
                seen[m as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "some tiles never drawn as mines");
    }

    #[test]
    fn test_multiplier_progression() {
        assert_eq!(multiplier(0, 3), 1.0);
        let one = multiplier(1, 3);
        assert!((one - 25.0 / 22.0).abs() < 1e-12);
        // Monotonically increasing up to the cap.
        let mut prev = 1.0;
        for k in 1..=22 {
            let m = multiplier(k, 3);
            assert!(m >= prev, "multiplier not monotonic at {}", k);
            assert!(m <= MAX_MULTIPLIER);
            prev = m;
        }
        assert_eq!(multiplier(22, 3), MAX_MULTIPLIER);
    }

    #[test]
    fn test_multiplier_cap_with_many_mines() {
        assert_eq!(multiplier(1, 24), MAX_MULTIPLIER.min(25.0));
        assert_eq!(multiplier(1, 24), MAX_MULTIPLIER);
    }

    #[test]
    fn test_honest_reveal_matches_mine_set() {
        let seed = generate_server_seed();
        let mines = place_mines(3, &seed, "honest", 1).expect("place");
        for tile in 0..GRID_SIZE as u8 {
            let resolution =
                resolve_reveal(tile, &mines, &[], 0.0, &seed, "honest", 1, 0).expect("reveal");
            if mines.contains(&tile) {
                assert_eq!(resolution, RevealResolution::Mine { hit_tile: tile });
            } else {
                assert_eq!(resolution, RevealResolution::Safe);
            }
        }
    }

    #[test]
    fn test_full_edge_always_hits_a_mine() {
        let seed = generate_server_seed();
        let mines = place_mines(3, &seed, "forced", 2).expect("place");
        let safe_tile = (0..GRID_SIZE as u8)
            .find(|t| !mines.contains(t))
            .expect("safe tile exists");
        for k in 0..5 {
            let resolution =
                resolve_reveal(safe_tile, &mines, &[], 1.0, &seed, "forced", 2, k).expect("reveal");
            match resolution {
                RevealResolution::Mine { hit_tile } => {
                    assert!(mines.contains(&hit_tile), "forced hit on a non-mine tile");
                }
                RevealResolution::Safe => panic!("full edge produced a safe reveal"),
            }
        }
    }

    #[test]
    fn test_forced_hit_prefers_clicked_mine() {
        let seed = generate_server_seed();
        let mines = place_mines(3, &seed, "prefer", 3).expect("place");
        let mine_tile = mines[0];
        let resolution =
            resolve_reveal(mine_tile, &mines, &[], 1.0, &seed, "prefer", 3, 0).expect("reveal");
        assert_eq!(resolution, RevealResolution::Mine { hit_tile: mine_tile });
    }

    #[test]
    fn test_forced_rate_tracks_house_edge() {
        // With a safe click, hit frequency should approximate the edge.
        let seed = generate_server_seed();
        let house_edge = 0.3;
        let n = 20_000u64;
        let mut hits = 0u32;
        for nonce in 0..n {
            let mines = place_mines(3, &seed, "rate", nonce).expect("place");
            let safe_tile = (0..GRID_SIZE as u8)
                .find(|t| !mines.contains(t))
                .expect("safe tile");
            if matches!(
                resolve_reveal(safe_tile, &mines, &[], house_edge, &seed, "rate", nonce, 0)
                    .expect("reveal"),
                RevealResolution::Mine { .. }
            ) {
                hits += 1;
            }
        }
        let observed = hits as f64 / n as f64;
        assert!(
            (observed - house_edge).abs() < 0.015,
            "observed forced rate {:.4}, expected {:.4}",
            observed,
            house_edge
        );
    }
}
