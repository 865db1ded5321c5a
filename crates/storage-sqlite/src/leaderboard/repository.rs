use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use quizkit_core::exams::PASS_ACCURACY;
use quizkit_core::leaderboard::{
    score, LeaderboardEntry, LeaderboardQuery, LeaderboardRepositoryTrait, LeaderboardSnapshot,
    ResetCounts, Scope,
};
use quizkit_core::Result;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{
    exam_sessions, leaderboard_snapshots, user_activity_daily, user_badges, user_gamification,
    users,
};
use crate::util::{parse_ts, to_date, to_ts};

pub struct LeaderboardRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LeaderboardRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LeaderboardRepository { pool, writer }
    }
}

#[async_trait]
impl LeaderboardRepositoryTrait for LeaderboardRepository {
    fn compute(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>> {
        let mut conn = get_connection(&self.pool)?;

        // weighted answer counts from the activity ledger
        let mut activity = user_activity_daily::table
            .group_by(user_activity_daily::user_id)
            .select((
                user_activity_daily::user_id,
                diesel::dsl::sum(user_activity_daily::training_correct),
                diesel::dsl::sum(user_activity_daily::leitner_correct),
                diesel::dsl::sum(user_activity_daily::exam_correct),
            ))
            .into_boxed();
        if let Some(pool) = &query.pool_id {
            activity = activity.filter(user_activity_daily::pool_id.eq(pool.clone()));
        }
        if let Some((start, end)) = query.window {
            activity = activity
                .filter(user_activity_daily::activity_date.ge(to_date(start)))
                .filter(user_activity_daily::activity_date.le(to_date(end)));
        }
        let activity_rows: Vec<(String, Option<i64>, Option<i64>, Option<i64>)> =
            activity.load(&mut conn).map_err(StorageError::from)?;

        // passed-exam bonus
        let mut sessions = exam_sessions::table
            .filter(exam_sessions::finished_at.is_not_null())
            .select((
                exam_sessions::user_id,
                exam_sessions::correct_answers,
                exam_sessions::question_count,
                exam_sessions::finished_at,
            ))
            .into_boxed();
        if let Some(pool) = &query.pool_id {
            sessions = sessions.filter(exam_sessions::pool_id.eq(pool.clone()));
        }
        let session_rows: Vec<(String, Option<i32>, i32, Option<String>)> =
            sessions.load(&mut conn).map_err(StorageError::from)?;

        let mut passed: HashMap<String, i64> = HashMap::new();
        for (user, correct, total, finished) in session_rows {
            let Some(correct) = correct else { continue };
            if total <= 0 || (correct as f64 / total as f64) < PASS_ACCURACY {
                continue;
            }
            if let Some((start, end)) = query.window {
                let Some(finished) = finished.as_deref() else { continue };
                let day = parse_ts(finished)?.date_naive();
                if day < start || day > end {
                    continue;
                }
            }
            *passed.entry(user).or_insert(0) += 1;
        }

        let opted_in: HashMap<String, Option<String>> = users::table
            .filter(users::leaderboard_opt_in.eq(true))
            .select((users::id, users::display_name))
            .load::<(String, Option<String>)>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .collect();

        let mut scored: Vec<(String, i64)> = activity_rows
            .into_iter()
            .filter(|(user, ..)| opted_in.contains_key(user))
            .map(|(user, training, leitner, exam)| {
                let bonus = passed.remove(&user).unwrap_or(0);
                let total = score(
                    training.unwrap_or(0),
                    leitner.unwrap_or(0),
                    exam.unwrap_or(0),
                    bonus,
                );
                (user, total)
            })
            .filter(|(_, total)| *total > 0)
            .collect();
        // users with passed exams but no ledger rows in the window
        for (user, bonus) in passed {
            if opted_in.contains_key(&user) {
                scored.push((user.clone(), score(0, 0, 0, bonus)));
            }
        }

        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(query.limit);
        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (user, total))| LeaderboardEntry {
                rank: i as i32 + 1,
                display_name: opted_in.get(&user).cloned().flatten(),
                user_id: user,
                score: total,
            })
            .collect())
    }

    fn latest_snapshot(&self, snap_scope: Scope, period: &str) -> Result<Option<LeaderboardSnapshot>> {
        use crate::schema::leaderboard_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let row: Option<(String, String)> = leaderboard_snapshots
            .filter(scope.eq(snap_scope.as_str()))
            .filter(period_key.eq(period))
            .order(created_at.desc())
            .select((entries, created_at))
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|(entries_json, created)| {
            Ok(LeaderboardSnapshot {
                scope: snap_scope,
                period_key: period.to_string(),
                entries: serde_json::from_str(&entries_json)?,
                created_at: parse_ts(&created)?,
            })
        })
        .transpose()
    }

    async fn store_snapshot(
        &self,
        snap_scope: Scope,
        period: String,
        snapshot_entries: Vec<LeaderboardEntry>,
    ) -> Result<()> {
        use crate::schema::leaderboard_snapshots::dsl::*;

        self.writer
            .exec(move |conn| {
                diesel::insert_into(leaderboard_snapshots)
                    .values((
                        id.eq(Uuid::new_v4().to_string()),
                        scope.eq(snap_scope.as_str()),
                        period_key.eq(&period),
                        entries.eq(serde_json::to_string(&snapshot_entries)?),
                        created_at.eq(to_ts(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn reset_all(&self) -> Result<ResetCounts> {
        self.writer
            .exec(move |conn| {
                let mut counts = ResetCounts::default();
                counts.snapshots = diesel::delete(leaderboard_snapshots::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                counts.activity = diesel::delete(user_activity_daily::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                counts.badges = diesel::delete(user_badges::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                counts.gamification = diesel::delete(user_gamification::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                counts.exam_answers = diesel::delete(crate::schema::exam_answers::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                counts.exam_sessions = diesel::delete(exam_sessions::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(counts)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::merge_daily_activity;
    use crate::testing::{insert_user, seed_basic_content, setup_db};
    use quizkit_core::activity::ActivityDelta;
    use quizkit_core::audit::noop_sink;
    use quizkit_core::leaderboard::LeaderboardService;

    async fn add_activity(db: &crate::testing::TestDb, user: &str, pool: &str, correct: i32) {
        let user = user.to_string();
        let pool = pool.to_string();
        let delta = ActivityDelta {
            training_correct: correct,
            total_answered: correct,
            ..Default::default()
        };
        db.writer
            .exec(move |conn| {
                merge_daily_activity(conn, &user, &pool, Utc::now().date_naive(), &delta)
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn compute_respects_opt_in_and_weights() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        insert_user(&mut conn, "u2", true);
        insert_user(&mut conn, "hidden", false);
        let repo = LeaderboardRepository::new(db.pool.clone(), db.writer.clone());

        add_activity(&db, "u1", "p1", 3).await;
        add_activity(&db, "u2", "p1", 10).await;
        add_activity(&db, "hidden", "p1", 100).await;

        let entries = repo
            .compute(&LeaderboardQuery {
                scope: Scope::Global,
                pool_id: None,
                window: None,
                limit: 50,
            })
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_id, "u2");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].score, 10);
        assert_eq!(entries[1].user_id, "u1");
    }

    #[tokio::test]
    async fn snapshot_is_served_within_ttl_despite_new_activity() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = Arc::new(LeaderboardRepository::new(db.pool.clone(), db.writer.clone()));
        let service = LeaderboardService::new(repo.clone(), noop_sink());

        add_activity(&db, "u1", "p1", 5).await;
        let first = service.get(Scope::Global, None, 10).await.unwrap();
        assert_eq!(first[0].score, 5);

        add_activity(&db, "u1", "p1", 5).await;
        let second = service.get(Scope::Global, None, 10).await.unwrap();
        // still the cached snapshot
        assert_eq!(second, first);

        // a live pool query sees the new data immediately
        let live = service.get(Scope::Pool, Some("p1"), 10).await.unwrap();
        assert_eq!(live[0].score, 10);
    }

    #[tokio::test]
    async fn reset_all_reports_per_table_counts() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = LeaderboardRepository::new(db.pool.clone(), db.writer.clone());

        add_activity(&db, "u1", "p1", 5).await;
        db.writer
            .exec(|conn| crate::gamification::award_xp(conn, "u1", 5.0).map(|_| ()))
            .await
            .unwrap();
        repo.store_snapshot(Scope::Global, "all".to_string(), vec![])
            .await
            .unwrap();

        let counts = repo.reset_all().await.unwrap();
        assert_eq!(counts.snapshots, 1);
        assert_eq!(counts.activity, 1);
        assert_eq!(counts.gamification, 1);
        assert_eq!(counts.exam_sessions, 0);
    }
}
