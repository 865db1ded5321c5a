//! XP accounts, level derivation, and the static gamification rule table.

mod models;
mod service;

pub use models::{
    DuelXpRules, GamificationAccount, GamificationConfig, GamificationSnapshot,
    GamificationSummary, SnapshotTtlSeconds, StreakRules, XpRules,
};
pub use service::GamificationService;

use async_trait::async_trait;

use crate::errors::Result;

/// Level as a pure function of xp: `floor(sqrt(xp / 10))`, never negative.
pub fn calc_level(xp: f64) -> i32 {
    (xp.max(0.0) / 10.0).sqrt().floor() as i32
}

#[async_trait]
pub trait GamificationRepositoryTrait: Send + Sync {
    /// Atomically increments xp by `delta` (clamped to >= 0), creating the
    /// account at xp = 0 if absent, and recomputes the level. Safe to call
    /// concurrently from different scoring paths.
    async fn award(&self, user_id: &str, delta: f64) -> Result<GamificationSnapshot>;

    fn load(&self, user_id: &str) -> Result<Option<GamificationAccount>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_floor_sqrt_of_tenth() {
        assert_eq!(calc_level(0.0), 0);
        assert_eq!(calc_level(9.9), 0);
        assert_eq!(calc_level(10.0), 1);
        assert_eq!(calc_level(39.9), 1);
        assert_eq!(calc_level(40.0), 2);
        assert_eq!(calc_level(1000.0), 10);
    }

    #[test]
    fn level_never_negative() {
        assert_eq!(calc_level(-5.0), 0);
    }

    #[test]
    fn level_is_monotonic() {
        let mut last = 0;
        for xp in 0..2000 {
            let level = calc_level(xp as f64);
            assert!(level >= last);
            last = level;
        }
    }
}
