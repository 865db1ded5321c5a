use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::audit::AuditSink;
use crate::errors::{Error, Result};
use crate::time::trailing_week_window;

use super::{
    LeaderboardEntry, LeaderboardQuery, LeaderboardRepositoryTrait, ResetCounts, Scope,
    GLOBAL_SNAPSHOT_TTL_SECS, SNAPSHOT_LIMIT, WEEKLY_SNAPSHOT_TTL_SECS,
};

pub struct LeaderboardService {
    leaderboard: Arc<dyn LeaderboardRepositoryTrait>,
    audit: Arc<dyn AuditSink>,
}

impl LeaderboardService {
    pub fn new(leaderboard: Arc<dyn LeaderboardRepositoryTrait>, audit: Arc<dyn AuditSink>) -> Self {
        Self { leaderboard, audit }
    }

    pub async fn get(
        &self,
        scope: Scope,
        pool_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit.clamp(1, SNAPSHOT_LIMIT);
        match scope {
            Scope::Pool => {
                let pool_id = pool_id
                    .ok_or_else(|| Error::validation("pool scope requires a pool id"))?;
                self.leaderboard.compute(&LeaderboardQuery {
                    scope,
                    pool_id: Some(pool_id.to_string()),
                    window: None,
                    limit,
                })
            }
            Scope::Global | Scope::Weekly => self.cached(scope, limit).await,
        }
    }

    /// Serves the newest snapshot while it is younger than the scope's TTL;
    /// otherwise recomputes up to the internal cap, stores the new snapshot,
    /// and serves that.
    async fn cached(&self, scope: Scope, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let now = Utc::now();
        let (period_key, window, ttl_secs) = match scope {
            Scope::Weekly => {
                let (start, end) = trailing_week_window(now.date_naive());
                (
                    format!("{start}..{end}"),
                    Some((start, end)),
                    WEEKLY_SNAPSHOT_TTL_SECS,
                )
            }
            _ => ("all".to_string(), None, GLOBAL_SNAPSHOT_TTL_SECS),
        };

        if let Some(snapshot) = self.leaderboard.latest_snapshot(scope, &period_key)? {
            let age = now.signed_duration_since(snapshot.created_at);
            if age.num_seconds() < ttl_secs {
                let mut entries = snapshot.entries;
                entries.truncate(limit);
                return Ok(entries);
            }
        }

        let entries = self.leaderboard.compute(&LeaderboardQuery {
            scope,
            pool_id: None,
            window,
            limit: SNAPSHOT_LIMIT,
        })?;
        self.leaderboard
            .store_snapshot(scope, period_key, entries.clone())
            .await?;
        let mut entries = entries;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Admin-only destructive reset of all progression data behind the
    /// leaderboards.
    pub async fn reset_all(&self) -> Result<ResetCounts> {
        let counts = self.leaderboard.reset_all().await?;
        self.audit.record(
            "leaderboard_reset_all",
            None,
            json!({
                "snapshots": counts.snapshots,
                "activity": counts.activity,
                "badges": counts.badges,
                "gamification": counts.gamification,
                "exam_answers": counts.exam_answers,
                "exam_sessions": counts.exam_sessions,
            }),
        );
        Ok(counts)
    }
}
