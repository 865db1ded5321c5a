use std::sync::Arc;

use chrono::{Duration, Utc};
use log::warn;

use crate::activity::{ActivityRepositoryTrait, STREAK_LOOKBACK_DAYS};
use crate::badges::{badge_catalog, evaluate, BadgeFacts, BadgeRepositoryTrait};
use crate::duels::DuelRepositoryTrait;
use crate::errors::Result;
use crate::exams::ExamRepositoryTrait;
use crate::leaderboard::{GLOBAL_SNAPSHOT_TTL_SECS, WEEKLY_SNAPSHOT_TTL_SECS};
use crate::leitner::LeitnerRepositoryTrait;
use crate::streaks::{daily_streak, weekly_streak};
use crate::time::{local_date, TimezoneCache};

use super::{
    DuelXpRules, GamificationConfig, GamificationRepositoryTrait, GamificationSummary,
    SnapshotTtlSeconds, StreakRules, XpRules,
};

/// Read-side composition of the whole progression state for one user:
/// account, streaks, and badges in a single summary.
pub struct GamificationService {
    gamification: Arc<dyn GamificationRepositoryTrait>,
    activity: Arc<dyn ActivityRepositoryTrait>,
    badges: Arc<dyn BadgeRepositoryTrait>,
    exams: Arc<dyn ExamRepositoryTrait>,
    leitner: Arc<dyn LeitnerRepositoryTrait>,
    duels: Arc<dyn DuelRepositoryTrait>,
    timezones: Arc<TimezoneCache>,
    streak_rules: StreakRules,
}

impl GamificationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gamification: Arc<dyn GamificationRepositoryTrait>,
        activity: Arc<dyn ActivityRepositoryTrait>,
        badges: Arc<dyn BadgeRepositoryTrait>,
        exams: Arc<dyn ExamRepositoryTrait>,
        leitner: Arc<dyn LeitnerRepositoryTrait>,
        duels: Arc<dyn DuelRepositoryTrait>,
        timezones: Arc<TimezoneCache>,
    ) -> Self {
        Self {
            gamification,
            activity,
            badges,
            exams,
            leitner,
            duels,
            timezones,
            streak_rules: StreakRules::standard(),
        }
    }

    /// Builds the user's progression summary. Newly crossed badge thresholds
    /// are awarded as a side effect; an award failure degrades the summary
    /// instead of failing it.
    pub async fn summary(&self, user_id: &str, timezone: Option<&str>) -> Result<GamificationSummary> {
        let tz = self.timezones.resolve(timezone);
        let today = local_date(Utc::now(), tz);
        let since = today - Duration::days(STREAK_LOOKBACK_DAYS);

        let day_totals = self.activity.day_totals(user_id, since)?;
        let daily = daily_streak(&day_totals, today, &self.streak_rules);
        let weekly = weekly_streak(&day_totals, today, &self.streak_rules);

        let duel_stats = self.duels.stats_for(user_id)?;
        let facts = BadgeFacts {
            correct_total: self.activity.lifetime_correct_total(user_id)?,
            daily_streak: daily,
            passed_exams: self.exams.passed_exam_count(user_id)?,
            perfect_exams: self.exams.perfect_exam_count(user_id)?,
            box5_count: self.leitner.box5_count(user_id)?,
            duels_played: duel_stats.played,
            current_win_streak: duel_stats.current_win_streak,
            distinct_opponents: duel_stats.distinct_opponents,
        };
        let earned_keys = evaluate(&facts);
        if !earned_keys.is_empty() {
            if let Err(e) = self.badges.award(user_id, &earned_keys).await {
                warn!("badge award failed for {user_id}: {e}");
            }
        }

        let account = self.gamification.load(user_id)?;
        let (xp, level, last_awarded_at) = match account {
            Some(a) => (a.xp, a.level, a.last_awarded_at),
            None => (0.0, 0, None),
        };
        Ok(GamificationSummary {
            xp,
            level,
            daily_streak: daily,
            weekly_streak: weekly,
            badges: self.badges.earned(user_id)?,
            last_awarded_at,
        })
    }

    /// The static rule table served to clients.
    pub fn config(&self) -> GamificationConfig {
        GamificationConfig {
            xp_rules: XpRules::standard(),
            duel_xp: DuelXpRules::standard(),
            streak_rules: self.streak_rules,
            leaderboard_scopes: vec![
                "global".to_string(),
                "weekly".to_string(),
                "pool".to_string(),
            ],
            leaderboard_snapshot_ttl_sec: SnapshotTtlSeconds {
                global: GLOBAL_SNAPSHOT_TTL_SECS as u64,
                weekly: WEEKLY_SNAPSHOT_TTL_SECS as u64,
            },
            badges: badge_catalog(),
            level_formula: "floor(sqrt(xp / 10))".to_string(),
            timezone: "per-user IANA, UTC fallback".to_string(),
        }
    }
}
