use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityDelta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: String,
    pub user_id: String,
    pub pool_id: String,
    /// Frozen at start, in presentation order.
    pub question_ids: Vec<String>,
    pub question_count: i32,
    pub correct_answers: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewExamSession {
    pub user_id: String,
    pub pool_id: String,
    pub question_ids: Vec<String>,
}

/// One raw answer as submitted by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamAnswerInput {
    pub question_id: String,
    pub selected_answer_ids: Vec<String>,
}

/// One answer after grading against the authoritative correct set.
#[derive(Debug, Clone)]
pub struct GradedExamAnswer {
    pub question_id: String,
    pub selected_answer_ids: Vec<String>,
    pub correct: bool,
}

/// Fully graded submission ready to be applied transactionally.
#[derive(Debug, Clone)]
pub struct ExamSubmission {
    pub session_id: String,
    pub user_id: String,
    pub pool_id: String,
    pub answers: Vec<GradedExamAnswer>,
    pub correct_count: i32,
    pub local_date: NaiveDate,
    pub xp: f64,
    pub delta: ActivityDelta,
}

/// What the caller learns from a graded exam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExamOutcome {
    pub correct: i32,
    pub total: i32,
    pub accuracy: f64,
    pub passed: bool,
    pub xp_awarded: f64,
    pub xp: f64,
    pub level: i32,
}
