use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable catalog entry with localized name and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub key: String,
    pub name_de: String,
    pub name_en: String,
    pub description_de: String,
    pub description_en: String,
    pub icon: Option<String>,
}

/// A badge a user has earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub key: String,
    pub earned_at: DateTime<Utc>,
}

/// Aggregate counts badge thresholds are evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeFacts {
    /// Correct answers across training + leitner + exam, lifetime.
    pub correct_total: i64,
    pub daily_streak: u32,
    /// Finished exams with accuracy >= 80%.
    pub passed_exams: i64,
    /// Finished exams with every answer correct.
    pub perfect_exams: i64,
    /// Leitner items currently in box 5.
    pub box5_count: i64,
    pub duels_played: i64,
    pub current_win_streak: i64,
    pub distinct_opponents: i64,
}
