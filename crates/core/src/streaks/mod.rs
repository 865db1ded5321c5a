//! Daily and weekly streak computation.
//!
//! Both streaks are pure functions of the day-total map and are recomputed
//! on every read; there is no cached streak state, so backfills need no
//! invalidation.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::activity::DayTotals;
use crate::gamification::StreakRules;
use crate::time::{iso_week_key, prev_iso_week_key};

/// Consecutive qualifying days ending at `today`. A day qualifies with
/// `total_answered >= daily_min_questions`; the streak stops at the first
/// gap or non-qualifying day.
pub fn daily_streak(day_totals: &DayTotals, today: NaiveDate, rules: &StreakRules) -> u32 {
    let mut streak = 0;
    let mut cursor = today;
    loop {
        match day_totals.get(&cursor) {
            Some(total) if *total >= rules.daily_min_questions => {
                streak += 1;
                cursor -= Duration::days(1);
            }
            _ => break,
        }
    }
    streak
}

/// Consecutive qualifying ISO weeks ending at `today`'s week. A week
/// qualifies when it contains at least `weekly_active_days` qualifying days.
///
/// Weeks are ISO 8601 (Monday start), which is not the same window as the
/// leaderboard's trailing 7 days.
pub fn weekly_streak(day_totals: &DayTotals, today: NaiveDate, rules: &StreakRules) -> u32 {
    let mut qualifying_days_per_week: HashMap<String, usize> = HashMap::new();
    for (date, total) in day_totals {
        if *total >= rules.daily_min_questions {
            *qualifying_days_per_week
                .entry(iso_week_key(*date))
                .or_insert(0) += 1;
        }
    }

    let mut streak = 0;
    let mut cursor = today;
    loop {
        let week = iso_week_key(cursor);
        match qualifying_days_per_week.get(&week) {
            Some(days) if *days >= rules.weekly_active_days => {
                streak += 1;
                let prev = prev_iso_week_key(cursor);
                cursor -= Duration::days(7);
                debug_assert_eq!(iso_week_key(cursor), prev);
            }
            _ => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> StreakRules {
        StreakRules::standard()
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn totals(entries: &[(&str, i64)]) -> DayTotals {
        entries.iter().map(|(day, n)| (d(day), *n)).collect()
    }

    #[test]
    fn daily_streak_stops_below_threshold() {
        // day-2 has only 5 answers, which breaks the chain at length 2.
        let t = totals(&[("2026-08-26", 12), ("2026-08-25", 15), ("2026-08-24", 5)]);
        assert_eq!(daily_streak(&t, d("2026-08-26"), &rules()), 2);
    }

    #[test]
    fn daily_streak_stops_at_gap() {
        let t = totals(&[("2026-08-26", 12), ("2026-08-24", 30)]);
        assert_eq!(daily_streak(&t, d("2026-08-26"), &rules()), 1);
    }

    #[test]
    fn daily_streak_zero_when_today_missing() {
        let t = totals(&[("2026-08-25", 12)]);
        assert_eq!(daily_streak(&t, d("2026-08-26"), &rules()), 0);
    }

    #[test]
    fn weekly_streak_requires_four_active_days() {
        // 2026-08-26 is a Wednesday in ISO week 2026-W35 (Mon 08-24).
        // Current week: 3 qualifying days -> does not qualify.
        let t = totals(&[
            ("2026-08-24", 10),
            ("2026-08-25", 10),
            ("2026-08-26", 10),
        ]);
        assert_eq!(weekly_streak(&t, d("2026-08-26"), &rules()), 0);
    }

    #[test]
    fn weekly_streak_counts_consecutive_weeks() {
        // Current week (W35) and previous week (W34) each have 4 qualifying
        // days; W33 has none.
        let t = totals(&[
            ("2026-08-24", 10),
            ("2026-08-25", 10),
            ("2026-08-26", 10),
            ("2026-08-27", 10),
            ("2026-08-17", 10),
            ("2026-08-18", 10),
            ("2026-08-19", 10),
            ("2026-08-20", 10),
        ]);
        assert_eq!(weekly_streak(&t, d("2026-08-26"), &rules()), 2);
    }

    #[test]
    fn weekly_streak_ignores_non_qualifying_days() {
        // Four days of activity but one is below the daily minimum.
        let t = totals(&[
            ("2026-08-24", 10),
            ("2026-08-25", 10),
            ("2026-08-26", 10),
            ("2026-08-27", 9),
        ]);
        assert_eq!(weekly_streak(&t, d("2026-08-26"), &rules()), 0);
    }
}
