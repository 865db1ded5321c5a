//! Exam sessions: a frozen random question sample graded in one submission.

mod models;
mod service;

pub use models::{
    ExamAnswerInput, ExamOutcome, ExamSession, ExamSubmission, GradedExamAnswer, NewExamSession,
};
pub use service::ExamService;

use async_trait::async_trait;

use crate::errors::Result;

/// A finished exam counts as passed at this accuracy.
pub const PASS_ACCURACY: f64 = 0.8;

#[async_trait]
pub trait ExamRepositoryTrait: Send + Sync {
    async fn create_session(&self, new_session: NewExamSession) -> Result<ExamSession>;

    fn load_session(&self, session_id: &str) -> Result<Option<ExamSession>>;

    /// Applies a graded submission in one transaction: re-checks that the
    /// session is still unfinished (`Conflict` otherwise), writes the answer
    /// rows and question stats, stamps the session, merges the activity
    /// delta, and awards the XP. Returns the post-award account snapshot.
    async fn submit(&self, submission: ExamSubmission) -> Result<crate::gamification::GamificationSnapshot>;

    /// Finished exams with accuracy ≥ 80%, for badges and the leaderboard
    /// bonus.
    fn passed_exam_count(&self, user_id: &str) -> Result<i64>;

    /// Finished exams with every answer correct.
    fn perfect_exam_count(&self, user_id: &str) -> Result<i64>;
}
