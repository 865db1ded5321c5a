use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::{Badge, EarnedBadge};

/// Persisted per-user XP account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamificationAccount {
    pub user_id: String,
    pub xp: f64,
    pub level: i32,
    pub last_awarded_at: Option<DateTime<Utc>>,
}

/// Result of an XP award: the account state after the increment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GamificationSnapshot {
    pub xp: f64,
    pub level: i32,
}

/// XP granted per answer event, by source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpRules {
    pub training_correct: f64,
    pub training_wrong: f64,
    pub swipe_correct: f64,
    pub leitner_correct: f64,
    pub exam_correct: f64,
    pub exam_bonus: f64,
}

impl XpRules {
    pub const fn standard() -> Self {
        Self {
            training_correct: 1.0,
            training_wrong: 0.25,
            swipe_correct: 10.0,
            leitner_correct: 2.0,
            exam_correct: 5.0,
            exam_bonus: 10.0,
        }
    }
}

/// Flat XP per duel outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuelXpRules {
    pub win: f64,
    pub loss: f64,
    pub draw: f64,
    pub expired: f64,
}

impl DuelXpRules {
    pub const fn standard() -> Self {
        Self {
            win: 20.0,
            loss: 5.0,
            draw: 10.0,
            expired: 5.0,
        }
    }
}

/// Qualification thresholds for streak computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRules {
    /// Minimum answers for a day to count toward streaks.
    pub daily_min_questions: i64,
    /// Minimum qualifying days for an ISO week to count.
    pub weekly_active_days: usize,
}

impl StreakRules {
    pub const fn standard() -> Self {
        Self {
            daily_min_questions: 10,
            weekly_active_days: 4,
        }
    }
}

/// Aggregate progression view for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationSummary {
    pub xp: f64,
    pub level: i32,
    pub daily_streak: u32,
    pub weekly_streak: u32,
    pub badges: Vec<EarnedBadge>,
    pub last_awarded_at: Option<DateTime<Utc>>,
}

/// Static rule table served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationConfig {
    pub xp_rules: XpRules,
    pub duel_xp: DuelXpRules,
    pub streak_rules: StreakRules,
    pub leaderboard_scopes: Vec<String>,
    pub leaderboard_snapshot_ttl_sec: SnapshotTtlSeconds,
    pub badges: Vec<Badge>,
    pub level_formula: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTtlSeconds {
    pub global: u64,
    pub weekly: u64,
}
