//! Badge catalog and threshold evaluation.
//!
//! Awards are monotonic and idempotent: a badge is inserted at most once per
//! user and never revoked.

mod catalog;
mod models;

pub use catalog::badge_catalog;
pub use models::{Badge, BadgeFacts, EarnedBadge};

use async_trait::async_trait;

use crate::errors::Result;

/// Badge keys whose thresholds the given facts currently meet.
pub fn evaluate(facts: &BadgeFacts) -> Vec<&'static str> {
    let mut earned = Vec::new();
    if facts.correct_total >= 100 {
        earned.push("erste_100");
    }
    if facts.correct_total >= 1000 {
        earned.push("erste_1000");
    }
    if facts.daily_streak >= 7 {
        earned.push("konsequent");
    }
    if facts.daily_streak >= 30 {
        earned.push("marathon");
    }
    if facts.passed_exams >= 3 {
        earned.push("pruefungssicher");
    }
    if facts.box5_count >= 50 {
        earned.push("leitner_meister");
    }
    if facts.perfect_exams >= 1 {
        earned.push("perfektionist");
    }
    if facts.duels_played >= 10 {
        earned.push("duellant");
    }
    if facts.current_win_streak >= 5 {
        earned.push("unbesiegbar");
    }
    if facts.distinct_opponents >= 5 {
        earned.push("sozial");
    }
    earned
}

#[async_trait]
pub trait BadgeRepositoryTrait: Send + Sync {
    /// Inserts missing (user, badge) rows; keys already earned are silently
    /// ignored and keep their original `earned_at`.
    async fn award(&self, user_id: &str, keys: &[&str]) -> Result<()>;

    /// Badges the user has earned, oldest first.
    fn earned(&self, user_id: &str) -> Result<Vec<EarnedBadge>>;
}
