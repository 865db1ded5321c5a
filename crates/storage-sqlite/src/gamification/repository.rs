use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use quizkit_core::gamification::{
    calc_level, GamificationAccount, GamificationRepositoryTrait, GamificationSnapshot,
};
use quizkit_core::Result;

use super::model::GamificationDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::user_gamification;
use crate::util::{parse_ts_opt, to_ts};

/// Atomic XP award: upserts the account, increments `xp` in place, and
/// recomputes the level from the post-increment value. Negative deltas are
/// clamped to 0. Shared by every scoring transaction.
pub fn award_xp(
    conn: &mut SqliteConnection,
    user: &str,
    delta: f64,
) -> Result<GamificationSnapshot> {
    use crate::schema::user_gamification::dsl::*;

    let delta = delta.max(0.0);
    let now = to_ts(Utc::now());
    diesel::insert_into(user_gamification)
        .values((
            user_id.eq(user),
            xp.eq(delta),
            level.eq(calc_level(delta)),
            last_awarded_at.eq(Some(now.clone())),
        ))
        .on_conflict(user_id)
        .do_update()
        .set((xp.eq(xp + delta), last_awarded_at.eq(Some(now))))
        .execute(conn)
        .map_err(StorageError::from)?;

    // Level is a function of the post-increment xp, which only the database
    // knows under concurrent awards.
    let new_xp: f64 = user_gamification
        .filter(user_id.eq(user))
        .select(xp)
        .first(conn)
        .map_err(StorageError::from)?;
    let new_level = calc_level(new_xp);
    diesel::update(user_gamification.filter(user_id.eq(user)))
        .set(level.eq(new_level))
        .execute(conn)
        .map_err(StorageError::from)?;

    Ok(GamificationSnapshot {
        xp: new_xp,
        level: new_level,
    })
}

/// Current snapshot without awarding anything; an absent account reads as
/// zero.
pub(crate) fn load_snapshot(conn: &mut SqliteConnection, user: &str) -> Result<GamificationSnapshot> {
    use crate::schema::user_gamification::dsl::*;

    let row: Option<(f64, i32)> = user_gamification
        .filter(user_id.eq(user))
        .select((xp, level))
        .first(conn)
        .optional()
        .map_err(StorageError::from)?;
    let (current_xp, current_level) = row.unwrap_or((0.0, 0));
    Ok(GamificationSnapshot {
        xp: current_xp,
        level: current_level,
    })
}

pub struct GamificationRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl GamificationRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        GamificationRepository { pool, writer }
    }
}

#[async_trait]
impl GamificationRepositoryTrait for GamificationRepository {
    async fn award(&self, user: &str, delta: f64) -> Result<GamificationSnapshot> {
        let user = user.to_string();
        self.writer
            .exec(move |conn| award_xp(conn, &user, delta))
            .await
    }

    fn load(&self, user: &str) -> Result<Option<GamificationAccount>> {
        let mut conn = get_connection(&self.pool)?;
        let row: Option<GamificationDB> = user_gamification::table
            .find(user)
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|db| {
            Ok(GamificationAccount {
                user_id: db.user_id,
                xp: db.xp,
                level: db.level,
                last_awarded_at: parse_ts_opt(db.last_awarded_at.as_deref())?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_db;

    #[tokio::test]
    async fn award_accumulates_and_levels_up() {
        let db = setup_db().await;
        let repo = GamificationRepository::new(db.pool.clone(), db.writer.clone());

        let first = repo.award("u1", 9.0).await.unwrap();
        assert_eq!(first.xp, 9.0);
        assert_eq!(first.level, 0);

        let second = repo.award("u1", 31.0).await.unwrap();
        assert_eq!(second.xp, 40.0);
        assert_eq!(second.level, 2);

        let account = repo.load("u1").unwrap().unwrap();
        assert_eq!(account.xp, 40.0);
        assert_eq!(account.level, 2);
        assert!(account.last_awarded_at.is_some());
    }

    #[tokio::test]
    async fn negative_delta_is_clamped() {
        let db = setup_db().await;
        let repo = GamificationRepository::new(db.pool.clone(), db.writer.clone());

        repo.award("u1", 10.0).await.unwrap();
        let after = repo.award("u1", -5.0).await.unwrap();
        assert_eq!(after.xp, 10.0);
    }

    #[tokio::test]
    async fn missing_account_loads_as_none() {
        let db = setup_db().await;
        let repo = GamificationRepository::new(db.pool.clone(), db.writer.clone());
        assert!(repo.load("nobody").unwrap().is_none());
    }

    #[tokio::test]
    async fn summary_composes_streaks_badges_and_account() {
        use chrono::{Duration, Utc};
        use quizkit_core::activity::ActivityDelta;
        use quizkit_core::exams::{
            ExamRepositoryTrait, ExamSubmission, GradedExamAnswer, NewExamSession,
        };
        use quizkit_core::gamification::GamificationService;
        use quizkit_core::time::TimezoneCache;

        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        crate::testing::seed_basic_content(&mut conn, "u1", "p1", 1);

        let exams = Arc::new(crate::exams::ExamRepository::new(
            db.pool.clone(),
            db.writer.clone(),
        ));
        let service = GamificationService::new(
            Arc::new(GamificationRepository::new(db.pool.clone(), db.writer.clone())),
            Arc::new(crate::activity::ActivityRepository::new(
                db.pool.clone(),
                db.writer.clone(),
            )),
            Arc::new(crate::badges::BadgeRepository::new(
                db.pool.clone(),
                db.writer.clone(),
            )),
            exams.clone(),
            Arc::new(crate::leitner::LeitnerRepository::new(
                db.pool.clone(),
                db.writer.clone(),
            )),
            Arc::new(crate::duels::DuelRepository::new(
                db.pool.clone(),
                db.writer.clone(),
            )),
            Arc::new(TimezoneCache::new()),
        );

        // ten answers today and yesterday keeps a two-day daily streak alive
        let today = Utc::now().date_naive();
        for date in [today, today - Duration::days(1)] {
            let delta = ActivityDelta::exam(6, 10);
            db.writer
                .exec(move |conn| {
                    crate::activity::merge_daily_activity(conn, "u1", "p1", date, &delta)
                })
                .await
                .unwrap();
        }

        // one perfect single-question exam crosses the perfektionist threshold
        let session = exams
            .create_session(NewExamSession {
                user_id: "u1".to_string(),
                pool_id: "p1".to_string(),
                question_ids: vec!["q1".to_string()],
            })
            .await
            .unwrap();
        exams
            .submit(ExamSubmission {
                session_id: session.id.clone(),
                user_id: "u1".to_string(),
                pool_id: "p1".to_string(),
                answers: vec![GradedExamAnswer {
                    question_id: "q1".to_string(),
                    selected_answer_ids: vec!["q1-a".to_string()],
                    correct: true,
                }],
                correct_count: 1,
                local_date: today,
                xp: 15.0,
                delta: ActivityDelta::exam(1, 1),
            })
            .await
            .unwrap();

        let summary = service.summary("u1", None).await.unwrap();
        assert_eq!(summary.daily_streak, 2);
        assert_eq!(summary.weekly_streak, 0);
        assert_eq!(summary.xp, 15.0);
        assert_eq!(summary.level, 1);
        let keys: Vec<&str> = summary.badges.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["perfektionist"]);

        // a second read re-awards nothing and keeps the original earned_at
        let again = service.summary("u1", None).await.unwrap();
        assert_eq!(again.badges.len(), 1);
        assert_eq!(again.badges[0].earned_at, summary.badges[0].earned_at);
    }
}
