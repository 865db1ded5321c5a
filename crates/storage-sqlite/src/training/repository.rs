use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use quizkit_core::gamification::GamificationSnapshot;
use quizkit_core::training::{QuestionStats, TrainingRepositoryTrait, TrainingScore};
use quizkit_core::Result;

use crate::activity::merge_daily_activity;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::gamification::award_xp;
use crate::schema::{user_question_stats, user_wrong_questions};
use crate::util::{parse_ts, to_ts};

/// Upserts the per-(user, question) stats row for one graded answer. The
/// consecutive-correct counter resets on a wrong answer.
pub(crate) fn upsert_question_stats(
    conn: &mut SqliteConnection,
    user: &str,
    question: &str,
    correct: bool,
) -> Result<()> {
    use crate::schema::user_question_stats::dsl::*;

    let now = to_ts(Utc::now());
    let existing: Option<(i64, i64, i64)> = user_question_stats
        .find((user, question))
        .select((times_asked, times_correct, consecutive_correct))
        .first(conn)
        .optional()
        .map_err(StorageError::from)?;

    match existing {
        Some((asked, correct_total, streak)) => {
            diesel::update(user_question_stats.find((user, question)))
                .set((
                    times_asked.eq(asked + 1),
                    times_correct.eq(correct_total + correct as i64),
                    consecutive_correct.eq(if correct { streak + 1 } else { 0 }),
                    last_answered_at.eq(now),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
        }
        None => {
            diesel::insert_into(user_question_stats)
                .values((
                    user_id.eq(user),
                    question_id.eq(question),
                    times_asked.eq(1),
                    times_correct.eq(correct as i64),
                    consecutive_correct.eq(correct as i64),
                    last_answered_at.eq(now),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
        }
    }
    Ok(())
}

/// Maintains the wrong-question list: a wrong answer files the question, a
/// correct one clears it.
pub(crate) fn track_wrong_question(
    conn: &mut SqliteConnection,
    user: &str,
    pool: &str,
    question: &str,
    correct: bool,
) -> Result<()> {
    use crate::schema::user_wrong_questions::dsl::*;

    if correct {
        diesel::delete(user_wrong_questions.find((user, question)))
            .execute(conn)
            .map_err(StorageError::from)?;
        return Ok(());
    }
    diesel::insert_into(user_wrong_questions)
        .values((
            user_id.eq(user),
            question_id.eq(question),
            pool_id.eq(pool),
            last_wrong_at.eq(to_ts(Utc::now())),
        ))
        .on_conflict((user_id, question_id))
        .do_update()
        .set(last_wrong_at.eq(to_ts(Utc::now())))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

pub struct TrainingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TrainingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        TrainingRepository { pool, writer }
    }
}

#[async_trait]
impl TrainingRepositoryTrait for TrainingRepository {
    async fn record(&self, score: TrainingScore) -> Result<GamificationSnapshot> {
        self.writer
            .exec(move |conn| {
                merge_daily_activity(
                    conn,
                    &score.user_id,
                    &score.pool_id,
                    score.local_date,
                    &score.delta,
                )?;
                upsert_question_stats(conn, &score.user_id, &score.question_id, score.correct)?;
                track_wrong_question(
                    conn,
                    &score.user_id,
                    &score.pool_id,
                    &score.question_id,
                    score.correct,
                )?;
                award_xp(conn, &score.user_id, score.xp)
            })
            .await
    }

    fn question_stats(&self, user: &str, question: &str) -> Result<Option<QuestionStats>> {
        use crate::schema::user_question_stats::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let row: Option<(i64, i64, i64, String)> = user_question_stats
            .find((user, question))
            .select((times_asked, times_correct, consecutive_correct, last_answered_at))
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|(asked, correct, streak, ts)| {
            Ok(QuestionStats {
                question_id: question.to_string(),
                times_asked: asked,
                times_correct: correct,
                consecutive_correct: streak,
                last_answered_at: parse_ts(&ts)?,
            })
        })
        .transpose()
    }

    fn wrong_questions(&self, user: &str, pool: &str) -> Result<Vec<String>> {
        use crate::schema::user_wrong_questions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        user_wrong_questions
            .filter(user_id.eq(user))
            .filter(pool_id.eq(pool))
            .order(last_wrong_at.desc())
            .select(question_id)
            .load(&mut conn)
            .map_err(StorageError::from)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_basic_content, setup_db};
    use chrono::NaiveDate;
    use quizkit_core::activity::ActivityDelta;

    fn score(user: &str, question: &str, correct: bool, xp: f64) -> TrainingScore {
        TrainingScore {
            user_id: user.to_string(),
            pool_id: "p1".to_string(),
            question_id: question.to_string(),
            local_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            correct,
            xp,
            delta: ActivityDelta::training(correct),
        }
    }

    #[tokio::test]
    async fn record_updates_stats_xp_and_wrong_list_together() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        let repo = TrainingRepository::new(db.pool.clone(), db.writer.clone());

        let snap = repo.record(score("u1", "q1", false, 0.25)).await.unwrap();
        assert_eq!(snap.xp, 0.25);
        assert_eq!(repo.wrong_questions("u1", "p1").unwrap(), vec!["q1"]);

        let snap = repo.record(score("u1", "q1", true, 1.0)).await.unwrap();
        assert_eq!(snap.xp, 1.25);
        assert!(repo.wrong_questions("u1", "p1").unwrap().is_empty());

        let stats = repo.question_stats("u1", "q1").unwrap().unwrap();
        assert_eq!(stats.times_asked, 2);
        assert_eq!(stats.times_correct, 1);
        assert_eq!(stats.consecutive_correct, 1);
    }

    #[tokio::test]
    async fn consecutive_correct_resets_on_wrong() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = TrainingRepository::new(db.pool.clone(), db.writer.clone());

        for correct in [true, true, false] {
            let xp = if correct { 1.0 } else { 0.25 };
            repo.record(score("u1", "q1", correct, xp)).await.unwrap();
        }
        let stats = repo.question_stats("u1", "q1").unwrap().unwrap();
        assert_eq!(stats.consecutive_correct, 0);
        assert_eq!(stats.times_correct, 2);
    }
}
