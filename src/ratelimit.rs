//! Per-user rate limiting
//!
//! Rolling-window action cap to blunt automated abuse. Timestamps are pruned
//! on every check; exceeding the cap is a rejection, never a silent skip.

use crate::config::RateLimitConfig;
use crate::errors::EngineError;
use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    config: RateLimitConfig,
    actions: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            actions: DashMap::new(),
        }
    }

    /// Record one action for the user, rejecting it when the rolling window
    /// is already full.
    pub fn check(&self, user_id: &str) -> Result<(), EngineError> {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);
        let mut entry = self.actions.entry(user_id.to_string()).or_default();

        entry.retain(|&at| now.duration_since(at) <= window);
        if entry.len() >= self.config.max_actions as usize {
            tracing::debug!(user_id, "rate limit exceeded");
            return Err(EngineError::RateLimited {
                limit: self.config.max_actions,
                window_secs: self.config.window_secs,
            });
        }
        entry.push(now);
        Ok(())
    }

    /// Drop users whose windows have fully drained. Callable from a
    /// periodic maintenance task.
    pub fn prune(&self) {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);
        self.actions.retain(|_, times| {
            times.retain(|&at| now.duration_since(at) <= window);
            !times.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_actions: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_actions,
            window_secs,
        })
    }

    #[test]
    fn test_allows_up_to_cap() {
        let limiter = limiter(5, 60);
        for _ in 0..5 {
            assert!(limiter.check("alice").is_ok());
        }
        assert!(matches!(
            limiter.check("alice"),
            Err(EngineError::RateLimited { limit: 5, .. })
        ));
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = limiter(2, 60);
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("alice").is_err());
        assert!(limiter.check("bob").is_ok());
    }

    #[test]
    fn test_rejection_does_not_consume_capacity() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("carol").is_ok());
        for _ in 0..10 {
            assert!(limiter.check("carol").is_err());
        }
        // Still exactly one recorded action.
        assert_eq!(limiter.actions.get("carol").expect("entry").len(), 1);
    }

    #[test]
    fn test_prune_drops_drained_users() {
        let limiter = limiter(5, 60);
        limiter.check("dave").expect("check");
        limiter.prune();
        // Window has not elapsed; entry stays.
        assert!(limiter.actions.contains_key("dave"));
    }
}
