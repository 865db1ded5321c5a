use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityDelta;

/// Graded answer ready to be applied transactionally.
#[derive(Debug, Clone)]
pub struct TrainingScore {
    pub user_id: String,
    pub pool_id: String,
    pub question_id: String,
    /// Calendar date in the user's timezone.
    pub local_date: NaiveDate,
    pub correct: bool,
    pub xp: f64,
    pub delta: ActivityDelta,
}

/// What the caller learns from one scored answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingAnswerOutcome {
    pub correct: bool,
    pub xp_awarded: f64,
    pub xp: f64,
    pub level: i32,
}

/// Lifetime per-question stats for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub times_asked: i64,
    pub times_correct: i64,
    /// Correct answers in a row; resets to 0 on a wrong answer.
    pub consecutive_correct: i64,
    pub last_answered_at: DateTime<Utc>,
}
