//! Engine configuration
//!
//! Centralized configuration with validated defaults, TOML file loading, and
//! environment variable overrides.

use crate::errors::ConfigError;
use crate::games::GameType;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub bets: BetConfig,
    pub house_edge: HouseEdgeConfig,
    pub rate_limit: RateLimitConfig,
}

/// Bet bounds applied before any reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetConfig {
    pub min_bet: f64,
    pub max_bet: f64,
}

/// Per-game house edge in [0, 1]. 0 = mathematically fair, 1 = the player
/// cannot win.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseEdgeConfig {
    pub crash: f64,
    pub dice: f64,
    pub mines: f64,
    pub plinko: f64,
}

/// Per-user rolling-window action cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_actions: u32,
    pub window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bets: BetConfig::default(),
            house_edge: HouseEdgeConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for BetConfig {
    fn default() -> Self {
        Self {
            min_bet: 0.01,
            max_bet: 1000.0,
        }
    }
}

impl Default for HouseEdgeConfig {
    fn default() -> Self {
        Self {
            crash: 0.04,
            dice: 0.04,
            mines: 0.04,
            plinko: 0.04,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_actions: 30,
            window_secs: 60,
        }
    }
}

impl HouseEdgeConfig {
    /// House edge for a game type. Lottery is settled externally and carries
    /// no engine edge.
    pub fn for_game(&self, game_type: GameType) -> f64 {
        match game_type {
            GameType::Crash => self.crash,
            GameType::Dice => self.dice,
            GameType::Mines => self.mines,
            GameType::Plinko => self.plinko,
            GameType::Lottery => 0.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// environment variable overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| ConfigError::LoadFailed {
                    path: p.display().to_string(),
                    reason: e.to_string(),
                })?;
                toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
                    path: p.display().to_string(),
                    reason: e.to_string(),
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_f64("FAIREDGE_MIN_BET") {
            self.bets.min_bet = v;
        }
        if let Some(v) = env_f64("FAIREDGE_MAX_BET") {
            self.bets.max_bet = v;
        }
        if let Some(v) = env_f64("FAIREDGE_HOUSE_EDGE") {
            self.house_edge = HouseEdgeConfig {
                crash: v,
                dice: v,
                mines: v,
                plinko: v,
            };
        }
        if let Ok(v) = env::var("FAIREDGE_RATE_LIMIT_MAX_ACTIONS") {
            if let Ok(parsed) = v.parse() {
                self.rate_limit.max_actions = parsed;
            }
        }
        if let Ok(v) = env::var("FAIREDGE_RATE_LIMIT_WINDOW_SECS") {
            if let Ok(parsed) = v.parse() {
                self.rate_limit.window_secs = parsed;
            }
        }
    }

    /// Validate all sections. Called on every load path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bets.min_bet.is_finite() && self.bets.min_bet > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "bets.min_bet".into(),
                reason: "must be a positive finite number".into(),
            });
        }
        if !(self.bets.max_bet.is_finite() && self.bets.max_bet >= self.bets.min_bet) {
            return Err(ConfigError::InvalidValue {
                field: "bets.max_bet".into(),
                reason: "must be finite and >= min_bet".into(),
            });
        }
        for (field, edge) in [
            ("house_edge.crash", self.house_edge.crash),
            ("house_edge.dice", self.house_edge.dice),
            ("house_edge.mines", self.house_edge.mines),
            ("house_edge.plinko", self.house_edge.plinko),
        ] {
            if !(0.0..=1.0).contains(&edge) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: "must be in [0, 1]".into(),
                });
            }
        }
        if self.rate_limit.max_actions == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit".into(),
                reason: "max_actions and window_secs must be nonzero".into(),
            });
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
