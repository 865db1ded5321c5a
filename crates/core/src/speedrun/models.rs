use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedrunSession {
    pub id: String,
    pub user_id: String,
    pub pool_id: String,
    pub duration_minutes: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_answered: i32,
    pub correct_count: i32,
}

impl SpeedrunSession {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Aggregated result of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedrunFinish {
    pub total_answered: i32,
    pub correct_count: i32,
    pub accuracy: f64,
    pub xp_awarded: f64,
    pub xp: f64,
    pub level: i32,
}

/// Best correct count per run duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationBest {
    pub duration_minutes: i32,
    pub best_correct: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedrunStats {
    pub total_runs: i64,
    pub best_correct: i32,
    pub average_accuracy: f64,
    pub per_duration: Vec<DurationBest>,
}
