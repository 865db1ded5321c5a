//! Daily activity ledger: per-user-per-pool-per-day answer counters.
//!
//! This is the single write path for every scoring subsystem; all counters
//! are monotonically non-decreasing per (user, pool, local-date) key.

mod models;

pub use models::{ActivityDelta, DayTotals};

use chrono::NaiveDate;

use crate::errors::Result;

/// Read side of the activity ledger. The merge itself always happens inside
/// the writer transaction of the enclosing scoring operation.
pub trait ActivityRepositoryTrait: Send + Sync {
    /// Per-day `total_answered` sums for a user since `since` (inclusive),
    /// keyed by local date.
    fn day_totals(&self, user_id: &str, since: NaiveDate) -> Result<DayTotals>;

    /// Lifetime correct answers across training + leitner + exam.
    fn lifetime_correct_total(&self, user_id: &str) -> Result<i64>;
}

/// How far back streak computation looks at the ledger.
pub const STREAK_LOOKBACK_DAYS: i64 = 60;
