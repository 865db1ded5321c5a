//! Weighted leaderboards with snapshot caching.
//!
//! Global and weekly boards are served from stored snapshots while young
//! enough; pool boards are always computed live. The weekly window is a
//! trailing 7-calendar-day span (UTC), not an ISO week.

mod models;
mod service;

pub use models::{
    LeaderboardEntry, LeaderboardQuery, LeaderboardSnapshot, ResetCounts, Scope,
};
pub use service::LeaderboardService;

use async_trait::async_trait;

use crate::errors::Result;

/// Snapshot freshness per scope.
pub const GLOBAL_SNAPSHOT_TTL_SECS: i64 = 6 * 60 * 60;
pub const WEEKLY_SNAPSHOT_TTL_SECS: i64 = 30 * 60;

/// Entries computed and stored per snapshot; requests are truncated to this.
pub const SNAPSHOT_LIMIT: usize = 50;

/// Score weights over the activity ledger plus the passed-exam bonus.
pub const TRAINING_WEIGHT: i64 = 1;
pub const LEITNER_WEIGHT: i64 = 2;
pub const EXAM_WEIGHT: i64 = 5;
pub const PASSED_EXAM_BONUS: i64 = 10;

/// Weighted score for one user's totals.
pub fn score(training_correct: i64, leitner_correct: i64, exam_correct: i64, passed_exams: i64) -> i64 {
    training_correct * TRAINING_WEIGHT
        + leitner_correct * LEITNER_WEIGHT
        + exam_correct * EXAM_WEIGHT
        + passed_exams * PASSED_EXAM_BONUS
}

#[async_trait]
pub trait LeaderboardRepositoryTrait: Send + Sync {
    /// Computes the board live: opted-in users only, descending score,
    /// limited by the query.
    fn compute(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>>;

    /// Newest stored snapshot for (scope, period key), if any.
    fn latest_snapshot(&self, scope: Scope, period_key: &str) -> Result<Option<LeaderboardSnapshot>>;

    async fn store_snapshot(
        &self,
        scope: Scope,
        period_key: String,
        entries: Vec<LeaderboardEntry>,
    ) -> Result<()>;

    /// Wipes snapshots, the activity ledger, user badges, gamification
    /// accounts, and exam answers/sessions in one transaction.
    async fn reset_all(&self) -> Result<ResetCounts>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_applies_weights_and_bonus() {
        assert_eq!(score(10, 5, 4, 2), 10 + 10 + 20 + 20);
        assert_eq!(score(0, 0, 0, 0), 0);
    }
}
