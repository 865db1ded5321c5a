use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Weekly,
    Pool,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Weekly => "weekly",
            Self::Pool => "pool",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "global" => Ok(Self::Global),
            "weekly" => Ok(Self::Weekly),
            "pool" => Ok(Self::Pool),
            other => Err(Error::validation(format!(
                "unknown leaderboard scope '{other}'"
            ))),
        }
    }

    /// Pool boards are never snapshotted.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Self::Pool)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub user_id: String,
    pub display_name: Option<String>,
    pub score: i64,
}

/// Live computation parameters handed to the repository.
#[derive(Debug, Clone)]
pub struct LeaderboardQuery {
    pub scope: Scope,
    pub pool_id: Option<String>,
    /// Inclusive local-date window, set only for the weekly scope.
    pub window: Option<(NaiveDate, NaiveDate)>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub scope: Scope,
    pub period_key: String,
    pub entries: Vec<LeaderboardEntry>,
    pub created_at: DateTime<Utc>,
}

/// Per-table delete counts from a full leaderboard-data reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCounts {
    pub snapshots: usize,
    pub activity: usize,
    pub badges: usize,
    pub gamification: usize,
    pub exam_answers: usize,
    pub exam_sessions: usize,
}
