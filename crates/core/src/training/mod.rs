//! Free-practice scoring: classic training answers and single-choice swipes.

mod models;
mod service;

pub use models::{QuestionStats, TrainingAnswerOutcome, TrainingScore};
pub use service::TrainingService;

use async_trait::async_trait;

use crate::errors::Result;
use crate::gamification::GamificationSnapshot;

#[async_trait]
pub trait TrainingRepositoryTrait: Send + Sync {
    /// Applies one graded answer in a single transaction: merges the daily
    /// activity delta, upserts per-question stats, maintains the
    /// wrong-question list (insert on wrong, remove on correct), and awards
    /// the XP delta.
    async fn record(&self, score: TrainingScore) -> Result<GamificationSnapshot>;

    fn question_stats(&self, user_id: &str, question_id: &str) -> Result<Option<QuestionStats>>;

    /// Question ids the user most recently answered wrong, scoped to a pool.
    fn wrong_questions(&self, user_id: &str, pool_id: &str) -> Result<Vec<String>>;
}
