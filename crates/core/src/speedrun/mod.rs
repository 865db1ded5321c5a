//! Timed answer sprints with duration-based finish XP.

mod models;
mod service;

pub use models::{DurationBest, SpeedrunFinish, SpeedrunSession, SpeedrunStats};
pub use service::SpeedrunService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{Error, Result};

/// Allowed run durations in minutes.
pub const DURATIONS_MIN: [i32; 3] = [1, 5, 10];

/// Finish XP per run duration.
pub fn xp_for_duration(minutes: i32) -> Result<f64> {
    match minutes {
        1 => Ok(5.0),
        5 => Ok(15.0),
        10 => Ok(25.0),
        other => Err(Error::validation(format!(
            "duration must be one of 1, 5, 10 minutes, got {other}"
        ))),
    }
}

#[async_trait]
pub trait SpeedrunRepositoryTrait: Send + Sync {
    async fn create_session(
        &self,
        user_id: &str,
        pool_id: &str,
        duration_minutes: i32,
    ) -> Result<SpeedrunSession>;

    fn load_session(&self, session_id: &str) -> Result<Option<SpeedrunSession>>;

    /// Insert-or-ignore on the (session, question) key. Returns whether the
    /// answer row was actually inserted.
    async fn record_answer(
        &self,
        session_id: &str,
        question_id: &str,
        correct: bool,
        time_ms: i64,
    ) -> Result<bool>;

    /// Aggregates the answer rows into the session, stamps `finished_at`,
    /// and awards the finish XP, all in one transaction. A second finish is
    /// a `Conflict`.
    async fn finish(
        &self,
        session_id: &str,
        finished_at: DateTime<Utc>,
        xp: f64,
    ) -> Result<SpeedrunFinish>;

    fn stats(&self, user_id: &str) -> Result<SpeedrunStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_ladder_by_duration() {
        assert_eq!(xp_for_duration(1).unwrap(), 5.0);
        assert_eq!(xp_for_duration(5).unwrap(), 15.0);
        assert_eq!(xp_for_duration(10).unwrap(), 25.0);
        assert!(xp_for_duration(3).is_err());
        assert!(xp_for_duration(0).is_err());
    }
}
