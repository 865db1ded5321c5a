//! Timezone resolution and calendar helpers.
//!
//! Two different "week" definitions coexist on purpose: streaks use ISO 8601
//! weeks (Monday start), while the weekly leaderboard uses a trailing
//! 7-calendar-day window ending today (UTC). They must not be conflated.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// Cache of IANA timezone names that have resolved successfully.
///
/// Owned by the service layer and shared by reference; losing it only costs
/// a re-validation on the next lookup.
#[derive(Default)]
pub struct TimezoneCache {
    valid: Mutex<HashSet<String>>,
}

impl TimezoneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves an IANA timezone name, falling back to UTC for anything
    /// unrecognized. Empty or missing names resolve to UTC without caching.
    pub fn resolve(&self, name: Option<&str>) -> Tz {
        let candidate = name.unwrap_or("").trim();
        if candidate.is_empty() {
            return Tz::UTC;
        }
        if let Ok(guard) = self.valid.lock() {
            if guard.contains(candidate) {
                // Cached names parsed successfully before.
                return Tz::from_str(candidate).unwrap_or(Tz::UTC);
            }
        }
        match Tz::from_str(candidate) {
            Ok(tz) => {
                if let Ok(mut guard) = self.valid.lock() {
                    guard.insert(candidate.to_string());
                }
                tz
            }
            Err(_) => Tz::UTC,
        }
    }
}

/// Calendar date of `instant` in the given timezone.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// ISO 8601 week key, e.g. "2026-W35".
pub fn iso_week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// ISO week key of the week preceding `date`'s week.
pub fn prev_iso_week_key(date: NaiveDate) -> String {
    iso_week_key(date - Duration::days(7))
}

/// Trailing 7-calendar-day window ending today (UTC), inclusive on both ends.
/// Used by the weekly leaderboard, independent of ISO week boundaries.
pub fn trailing_week_window(today_utc: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today_utc - Duration::days(6), today_utc)
}
