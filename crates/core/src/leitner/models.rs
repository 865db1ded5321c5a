use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityDelta;
use crate::errors::{Error, Result};

/// Review scheduling discipline of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeitnerMode {
    /// No due dates; every item is always reviewable.
    Simple,
    /// Per-box intervals gate reviews.
    Classic,
}

impl LeitnerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Classic => "classic",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "simple" => Ok(Self::Simple),
            "classic" => Ok(Self::Classic),
            other => Err(Error::validation(format!("unknown leitner mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeitnerSet {
    pub id: String,
    pub user_id: String,
    pub pool_id: String,
    pub name: String,
    pub mode: LeitnerMode,
    pub created_at: DateTime<Utc>,
    pub session_stats: SetSessionStats,
}

/// Per-set study bookkeeping, updated on every answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SetSessionStats {
    pub session_count: i64,
    pub total_correct: i64,
    pub total_wrong: i64,
    /// Consecutive local study days ending at the last study date.
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_study_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewLeitnerSet {
    pub user_id: String,
    pub pool_id: String,
    pub name: String,
    pub mode: LeitnerMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeitnerItem {
    pub set_id: String,
    pub question_id: String,
    pub box_number: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub last_answered_at: Option<DateTime<Utc>>,
}

/// One answer ready to be applied transactionally.
#[derive(Debug, Clone)]
pub struct LeitnerAnswerRecord {
    pub set_id: String,
    pub user_id: String,
    pub pool_id: String,
    pub question_id: String,
    pub correct: bool,
    pub mode: LeitnerMode,
    /// Calendar date in the user's timezone, for activity and streaks.
    pub local_date: NaiveDate,
    pub xp: f64,
    pub delta: ActivityDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeitnerAnswerOutcome {
    pub previous_box: i32,
    pub new_box: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub xp_awarded: f64,
    pub xp: f64,
    pub level: i32,
}

/// Per-box item counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeitnerStats {
    pub boxes: [i64; 5],
    pub total: i64,
}

impl LeitnerStats {
    /// Percentage of items in box 5, rounded to one decimal.
    pub fn mastery_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let pct = self.boxes[4] as f64 * 100.0 / self.total as f64;
        (pct * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeitnerProgress {
    pub boxes: [i64; 5],
    pub total: i64,
    pub mastered: i64,
    pub mastery_percent: f64,
    pub milestones: Vec<i32>,
    pub session_stats: SetSessionStats,
}

/// Result of a milestone check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneCheck {
    pub mastery_percent: f64,
    pub newly_recorded: Vec<i32>,
    pub already_recorded: Vec<i32>,
}
