use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Map of local date to `total_answered` for that day.
pub type DayTotals = HashMap<NaiveDate, i64>;

/// Counter increments merged into one daily activity row. All fields are
/// non-negative; merging sums elementwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDelta {
    pub training_correct: i32,
    pub training_wrong: i32,
    pub leitner_correct: i32,
    pub exam_correct: i32,
    pub exam_total: i32,
    pub total_answered: i32,
}

impl ActivityDelta {
    /// Delta for a single training or swipe answer.
    pub fn training(correct: bool) -> Self {
        Self {
            training_correct: correct as i32,
            training_wrong: !correct as i32,
            total_answered: 1,
            ..Default::default()
        }
    }

    /// Delta for a single leitner answer.
    pub fn leitner(correct: bool) -> Self {
        Self {
            leitner_correct: correct as i32,
            total_answered: 1,
            ..Default::default()
        }
    }

    /// Delta for a whole submitted exam.
    pub fn exam(correct: i32, total: i32) -> Self {
        Self {
            exam_correct: correct,
            exam_total: total,
            total_answered: total,
            ..Default::default()
        }
    }

    pub fn merge(&self, other: &Self) -> Self {
        Self {
            training_correct: self.training_correct + other.training_correct,
            training_wrong: self.training_wrong + other.training_wrong,
            leitner_correct: self.leitner_correct + other.leitner_correct,
            exam_correct: self.exam_correct + other.exam_correct,
            exam_total: self.exam_total + other.exam_total,
            total_answered: self.total_answered + other.total_answered,
        }
    }
}
