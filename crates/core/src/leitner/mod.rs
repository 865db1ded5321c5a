//! Leitner spaced-repetition boxes.
//!
//! Items move between boxes 1..=5; classic mode schedules reviews with
//! per-box intervals, simple mode ignores due dates entirely.

mod models;
mod service;

pub use models::{
    LeitnerAnswerOutcome, LeitnerAnswerRecord, LeitnerItem, LeitnerMode, LeitnerProgress,
    LeitnerSet, LeitnerStats, MilestoneCheck, NewLeitnerSet, SetSessionStats,
};
pub use service::LeitnerService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{Error, Result};

pub const BOX_MIN: i32 = 1;
pub const BOX_MAX: i32 = 5;

/// Mastery percentages that record a milestone the first time they are
/// reached.
pub const MILESTONES: [i32; 4] = [25, 50, 75, 100];

/// Review interval in days after landing in a box (classic mode).
pub fn box_interval_days(box_number: i32) -> i64 {
    match box_number {
        1 => 1,
        2 => 2,
        3 => 5,
        4 => 8,
        _ => 14,
    }
}

/// Next box after an answer: up one on correct, down one on wrong, clamped
/// to [1, 5].
pub fn advance_box(current: i32, correct: bool) -> i32 {
    let next = if correct { current + 1 } else { current - 1 };
    next.clamp(BOX_MIN, BOX_MAX)
}

/// Validates an optional box filter: every entry must lie in [1, 5].
pub fn validate_box_filter(boxes: &Option<Vec<i32>>) -> Result<()> {
    if let Some(list) = boxes {
        for b in list {
            if !(BOX_MIN..=BOX_MAX).contains(b) {
                return Err(Error::validation(format!("box {b} out of range")));
            }
        }
    }
    Ok(())
}

#[async_trait]
pub trait LeitnerRepositoryTrait: Send + Sync {
    fn load_set(&self, set_id: &str) -> Result<Option<LeitnerSet>>;

    fn list_sets(&self, user_id: &str) -> Result<Vec<LeitnerSet>>;

    /// Creation fails with `Conflict` when the user already has a set of
    /// that name for the pool.
    async fn create_set(&self, new_set: NewLeitnerSet) -> Result<LeitnerSet>;

    async fn delete_set(&self, set_id: &str) -> Result<()>;

    /// Inserts box-1 items for every question id not already present in the
    /// set. Returns the number actually inserted.
    async fn seed(&self, set_id: &str, user_id: &str, question_ids: Vec<String>) -> Result<usize>;

    /// Applies one answer in a single transaction: moves the item, updates
    /// the set's session and study-day bookkeeping, merges the activity
    /// delta, and awards XP on a correct answer.
    async fn answer(&self, record: LeitnerAnswerRecord) -> Result<LeitnerAnswerOutcome>;

    /// Items ready for review, honoring the set's mode (classic: `due_at`
    /// NULL or ≤ now; simple: all). Filter already validated.
    fn due_items(
        &self,
        set_id: &str,
        boxes: Option<Vec<i32>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeitnerItem>>;

    /// All items regardless of due dates.
    fn all_items(&self, set_id: &str, boxes: Option<Vec<i32>>) -> Result<Vec<LeitnerItem>>;

    fn stats(&self, set_id: &str) -> Result<LeitnerStats>;

    /// Milestones already recorded for a set, ascending.
    fn recorded_milestones(&self, set_id: &str) -> Result<Vec<i32>>;

    /// Records a milestone once per (user, set, milestone), snapshotting
    /// session count and days since set creation. Returns false when it was
    /// already recorded.
    async fn record_milestone(&self, set_id: &str, user_id: &str, milestone: i32) -> Result<bool>;

    /// Deletes every item in the set. Returns the number removed.
    async fn reset_items(&self, set_id: &str) -> Result<usize>;

    /// Box-5 item count across all of the user's sets, for badge facts.
    fn box5_count(&self, user_id: &str) -> Result<i64>;
}
