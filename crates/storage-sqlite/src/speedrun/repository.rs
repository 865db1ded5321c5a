use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use quizkit_core::errors::Error;
use quizkit_core::speedrun::{
    DurationBest, SpeedrunFinish, SpeedrunRepositoryTrait, SpeedrunSession, SpeedrunStats,
    DURATIONS_MIN,
};
use quizkit_core::Result;

use super::model::SpeedrunSessionDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::gamification::award_xp;
use crate::schema::{speedrun_answers, speedrun_sessions};
use crate::util::to_ts;

pub struct SpeedrunRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SpeedrunRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SpeedrunRepository { pool, writer }
    }
}

#[async_trait]
impl SpeedrunRepositoryTrait for SpeedrunRepository {
    async fn create_session(
        &self,
        user: &str,
        pool: &str,
        duration: i32,
    ) -> Result<SpeedrunSession> {
        let user = user.to_string();
        let pool = pool.to_string();
        self.writer
            .exec(move |conn| {
                let row = SpeedrunSessionDB {
                    id: Uuid::new_v4().to_string(),
                    user_id: user,
                    pool_id: pool,
                    duration_minutes: duration,
                    started_at: to_ts(Utc::now()),
                    finished_at: None,
                    total_answered: 0,
                    correct_count: 0,
                    xp_awarded: 0.0,
                };
                diesel::insert_into(speedrun_sessions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                row.into_domain()
            })
            .await
    }

    fn load_session(&self, session: &str) -> Result<Option<SpeedrunSession>> {
        let mut conn = get_connection(&self.pool)?;
        speedrun_sessions::table
            .find(session)
            .first::<SpeedrunSessionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(SpeedrunSessionDB::into_domain)
            .transpose()
    }

    async fn record_answer(
        &self,
        session: &str,
        question: &str,
        correct: bool,
        time: i64,
    ) -> Result<bool> {
        use crate::schema::speedrun_answers::dsl::*;

        let session = session.to_string();
        let question = question.to_string();
        self.writer
            .exec(move |conn| {
                let inserted = diesel::insert_or_ignore_into(speedrun_answers)
                    .values((
                        session_id.eq(&session),
                        question_id.eq(&question),
                        is_correct.eq(correct),
                        time_ms.eq(time),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(inserted > 0)
            })
            .await
    }

    async fn finish(
        &self,
        session: &str,
        at: DateTime<Utc>,
        xp: f64,
    ) -> Result<SpeedrunFinish> {
        use crate::schema::speedrun_sessions::dsl::*;

        let session = session.to_string();
        self.writer
            .exec(move |conn| {
                let row: SpeedrunSessionDB = speedrun_sessions
                    .find(&session)
                    .first(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| Error::not_found(format!("speedrun session {session}")))?;
                if row.finished_at.is_some() {
                    return Err(Error::conflict("speedrun already finished"));
                }

                let answers: Vec<bool> = speedrun_answers::table
                    .filter(speedrun_answers::session_id.eq(&session))
                    .select(speedrun_answers::is_correct)
                    .load(conn)
                    .map_err(StorageError::from)?;
                let total = answers.len() as i32;
                let correct = answers.iter().filter(|c| **c).count() as i32;
                let accuracy = if total > 0 {
                    correct as f64 / total as f64
                } else {
                    0.0
                };

                diesel::update(speedrun_sessions.find(&session))
                    .set((
                        finished_at.eq(Some(to_ts(at))),
                        total_answered.eq(total),
                        correct_count.eq(correct),
                        xp_awarded.eq(xp),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                let snapshot = award_xp(conn, &row.user_id, xp)?;

                Ok(SpeedrunFinish {
                    total_answered: total,
                    correct_count: correct,
                    accuracy,
                    xp_awarded: xp,
                    xp: snapshot.xp,
                    level: snapshot.level,
                })
            })
            .await
    }

    fn stats(&self, user: &str) -> Result<SpeedrunStats> {
        use crate::schema::speedrun_sessions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let finished: Vec<SpeedrunSessionDB> = speedrun_sessions
            .filter(user_id.eq(user))
            .filter(finished_at.is_not_null())
            .load(&mut conn)
            .map_err(StorageError::from)?;

        let total_runs = finished.len() as i64;
        let best_correct = finished.iter().map(|s| s.correct_count).max().unwrap_or(0);
        let average_accuracy = if finished.is_empty() {
            0.0
        } else {
            finished
                .iter()
                .map(|s| {
                    if s.total_answered > 0 {
                        s.correct_count as f64 / s.total_answered as f64
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
                / finished.len() as f64
        };
        let per_duration = DURATIONS_MIN
            .iter()
            .map(|minutes| DurationBest {
                duration_minutes: *minutes,
                best_correct: finished
                    .iter()
                    .filter(|s| s.duration_minutes == *minutes)
                    .map(|s| s.correct_count)
                    .max(),
            })
            .collect();

        Ok(SpeedrunStats {
            total_runs,
            best_correct,
            average_accuracy,
            per_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_basic_content, setup_db};

    #[tokio::test]
    async fn finish_aggregates_answers_once() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 3);
        let repo = SpeedrunRepository::new(db.pool.clone(), db.writer.clone());

        let session = repo.create_session("u1", "p1", 5).await.unwrap();
        assert!(repo.record_answer(&session.id, "q1", true, 1500).await.unwrap());
        assert!(repo.record_answer(&session.id, "q2", false, 2500).await.unwrap());
        // repeated question collapses
        assert!(!repo.record_answer(&session.id, "q1", false, 100).await.unwrap());

        let finish = repo.finish(&session.id, Utc::now(), 15.0).await.unwrap();
        assert_eq!(finish.total_answered, 2);
        assert_eq!(finish.correct_count, 1);
        assert_eq!(finish.accuracy, 0.5);
        assert_eq!(finish.xp, 15.0);

        let again = repo.finish(&session.id, Utc::now(), 15.0).await;
        assert!(matches!(again, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn stats_track_bests_per_duration() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 3);
        let repo = SpeedrunRepository::new(db.pool.clone(), db.writer.clone());

        let short = repo.create_session("u1", "p1", 1).await.unwrap();
        repo.record_answer(&short.id, "q1", true, 900).await.unwrap();
        repo.finish(&short.id, Utc::now(), 5.0).await.unwrap();

        let long = repo.create_session("u1", "p1", 10).await.unwrap();
        repo.record_answer(&long.id, "q1", true, 900).await.unwrap();
        repo.record_answer(&long.id, "q2", true, 900).await.unwrap();
        repo.finish(&long.id, Utc::now(), 25.0).await.unwrap();

        let stats = repo.stats("u1").unwrap();
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.best_correct, 2);
        assert_eq!(stats.average_accuracy, 1.0);
        let best_1 = stats.per_duration.iter().find(|d| d.duration_minutes == 1).unwrap();
        assert_eq!(best_1.best_correct, Some(1));
        let best_5 = stats.per_duration.iter().find(|d| d.duration_minutes == 5).unwrap();
        assert_eq!(best_5.best_correct, None);
    }
}
