use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DuelStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duel {
    pub id: String,
    pub challenger_id: String,
    pub opponent_id: Option<String>,
    pub pool_id: String,
    pub question_count: i32,
    /// Ordered question list, frozen at creation.
    pub question_ids: Vec<String>,
    pub status: DuelStatus,
    pub is_open: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Duel {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.challenger_id == user_id || self.opponent_id.as_deref() == Some(user_id)
    }

    pub fn includes_question(&self, question_id: &str) -> bool {
        self.question_ids.iter().any(|q| q == question_id)
    }
}

/// Caller-facing request to create a duel.
#[derive(Debug, Clone)]
pub struct CreateDuelRequest {
    pub challenger_id: String,
    pub opponent_id: Option<String>,
    pub pool_id: String,
    pub question_count: Option<i32>,
    pub is_open: bool,
}

/// Fully validated duel ready for insertion.
#[derive(Debug, Clone)]
pub struct NewDuel {
    pub challenger_id: String,
    pub opponent_id: Option<String>,
    pub pool_id: String,
    pub question_count: i32,
    pub question_ids: Vec<String>,
    pub is_open: bool,
    pub expires_at: DateTime<Utc>,
}

/// One participant's answer to one duel question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelAnswer {
    pub user_id: String,
    pub question_id: String,
    pub selected_answer_ids: Vec<String>,
    pub is_correct: bool,
    pub time_ms: i64,
    pub answered_at: DateTime<Utc>,
}

/// Validated answer submission handed to the repository.
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub duel_id: String,
    pub user_id: String,
    pub question_id: String,
    pub selected_answer_ids: Vec<String>,
    /// Already clamped to [0, MAX_ANSWER_TIME_MS].
    pub time_ms: i64,
}

/// What the caller learns from a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Distinct questions this participant has answered so far.
    pub answered: i64,
    /// True when this submission completed the duel.
    pub finished: bool,
}

/// Per-participant completion record. `is_winner` is NULL exactly for draws
/// and until resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelResult {
    pub user_id: String,
    pub correct_count: i32,
    pub total_time_ms: i64,
    pub is_winner: Option<bool>,
    pub xp_earned: f64,
}

/// Score pair fed into resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantScore {
    pub user_id: String,
    pub correct_count: i32,
    pub total_time_ms: i64,
}

/// Row in a user's duel list, with their own result when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelListEntry {
    pub id: String,
    pub status: DuelStatus,
    pub pool_id: String,
    pub question_count: i32,
    pub is_open: bool,
    pub opponent_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub my_result: Option<DuelResult>,
}

/// Open challenge visible to other users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenDuelEntry {
    pub id: String,
    pub pool_id: String,
    pub question_count: i32,
    pub challenger_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Full per-viewer duel view. Until the duel is finished, `answers` holds
/// only the viewer's own rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelDetail {
    pub duel: Duel,
    pub answers: Vec<DuelAnswer>,
    pub results: Vec<DuelResult>,
}

/// Aggregate duel history for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelStats {
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
    pub played: i64,
    pub distinct_opponents: i64,
    pub current_win_streak: i64,
    pub best_win_streak: i64,
}
