use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use quizkit_core::errors::Error;
use quizkit_core::exams::{ExamRepositoryTrait, ExamSession, ExamSubmission, NewExamSession, PASS_ACCURACY};
use quizkit_core::gamification::GamificationSnapshot;
use quizkit_core::Result;

use super::model::ExamSessionDB;
use crate::activity::merge_daily_activity;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::gamification::award_xp;
use crate::schema::{exam_answers, exam_sessions};
use crate::training::upsert_question_stats;
use crate::util::{to_json_list, to_ts};

pub struct ExamRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ExamRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ExamRepository { pool, writer }
    }

    fn finished_sessions(&self, user: &str) -> Result<Vec<(i32, i32)>> {
        use crate::schema::exam_sessions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<(Option<i32>, i32)> = exam_sessions
            .filter(user_id.eq(user))
            .filter(finished_at.is_not_null())
            .select((correct_answers, question_count))
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .filter_map(|(correct, total)| correct.map(|c| (c, total)))
            .collect())
    }
}

#[async_trait]
impl ExamRepositoryTrait for ExamRepository {
    async fn create_session(&self, new_session: NewExamSession) -> Result<ExamSession> {
        self.writer
            .exec(move |conn| {
                let row = ExamSessionDB {
                    id: Uuid::new_v4().to_string(),
                    user_id: new_session.user_id,
                    pool_id: new_session.pool_id,
                    question_count: new_session.question_ids.len() as i32,
                    question_ids: to_json_list(&new_session.question_ids)?,
                    correct_answers: None,
                    started_at: to_ts(Utc::now()),
                    finished_at: None,
                };
                diesel::insert_into(exam_sessions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                row.into_domain()
            })
            .await
    }

    fn load_session(&self, session: &str) -> Result<Option<ExamSession>> {
        let mut conn = get_connection(&self.pool)?;
        exam_sessions::table
            .find(session)
            .first::<ExamSessionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(ExamSessionDB::into_domain)
            .transpose()
    }

    async fn submit(&self, submission: ExamSubmission) -> Result<GamificationSnapshot> {
        self.writer
            .exec(move |conn| {
                use crate::schema::exam_sessions::dsl::*;

                // Re-check under the writer lock; a racing submit of the
                // same session must not double-score.
                let current: Option<Option<String>> = exam_sessions
                    .find(&submission.session_id)
                    .select(finished_at)
                    .first(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                match current {
                    None => {
                        return Err(Error::not_found(format!(
                            "exam session {}",
                            submission.session_id
                        )))
                    }
                    Some(Some(_)) => return Err(Error::conflict("exam already submitted")),
                    Some(None) => {}
                }

                for answer in &submission.answers {
                    diesel::insert_into(exam_answers::table)
                        .values((
                            exam_answers::session_id.eq(&submission.session_id),
                            exam_answers::question_id.eq(&answer.question_id),
                            exam_answers::selected_answer_ids
                                .eq(to_json_list(&answer.selected_answer_ids)?),
                            exam_answers::is_correct.eq(answer.correct),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    upsert_question_stats(
                        conn,
                        &submission.user_id,
                        &answer.question_id,
                        answer.correct,
                    )?;
                }

                diesel::update(exam_sessions.find(&submission.session_id))
                    .set((
                        correct_answers.eq(Some(submission.correct_count)),
                        finished_at.eq(Some(to_ts(Utc::now()))),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                merge_daily_activity(
                    conn,
                    &submission.user_id,
                    &submission.pool_id,
                    submission.local_date,
                    &submission.delta,
                )?;
                award_xp(conn, &submission.user_id, submission.xp)
            })
            .await
    }

    fn passed_exam_count(&self, user: &str) -> Result<i64> {
        Ok(self
            .finished_sessions(user)?
            .into_iter()
            .filter(|(correct, total)| {
                *total > 0 && (*correct as f64 / *total as f64) >= PASS_ACCURACY
            })
            .count() as i64)
    }

    fn perfect_exam_count(&self, user: &str) -> Result<i64> {
        Ok(self
            .finished_sessions(user)?
            .into_iter()
            .filter(|(correct, total)| *total > 0 && correct == total)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_basic_content, setup_db};
    use chrono::NaiveDate;
    use quizkit_core::activity::ActivityDelta;
    use quizkit_core::exams::GradedExamAnswer;

    fn graded(question: &str, correct: bool) -> GradedExamAnswer {
        GradedExamAnswer {
            question_id: question.to_string(),
            selected_answer_ids: vec![format!("{question}-a")],
            correct,
        }
    }

    fn submission(session: &ExamSession, answers: Vec<GradedExamAnswer>, xp: f64) -> ExamSubmission {
        let correct_count = answers.iter().filter(|a| a.correct).count() as i32;
        let total = answers.len() as i32;
        ExamSubmission {
            session_id: session.id.clone(),
            user_id: "u1".to_string(),
            pool_id: "p1".to_string(),
            answers,
            correct_count,
            local_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            xp,
            delta: ActivityDelta::exam(correct_count, total),
        }
    }

    async fn start(repo: &ExamRepository, questions: &[&str]) -> ExamSession {
        repo.create_session(NewExamSession {
            user_id: "u1".to_string(),
            pool_id: "p1".to_string(),
            question_ids: questions.iter().map(|q| q.to_string()).collect(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn submit_grades_and_stamps_the_session() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 5);
        let repo = ExamRepository::new(db.pool.clone(), db.writer.clone());
        let session = start(&repo, &["q1", "q2", "q3", "q4", "q5"]).await;

        let answers = vec![
            graded("q1", true),
            graded("q2", true),
            graded("q3", true),
            graded("q4", true),
            graded("q5", false),
        ];
        // 4 correct of 5 passes: 4*5 + 10 bonus
        let snap = repo.submit(submission(&session, answers, 30.0)).await.unwrap();
        assert_eq!(snap.xp, 30.0);

        let loaded = repo.load_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.correct_answers, Some(4));
        assert!(loaded.is_finished());
        assert_eq!(repo.passed_exam_count("u1").unwrap(), 1);
        assert_eq!(repo.perfect_exam_count("u1").unwrap(), 0);
    }

    #[tokio::test]
    async fn double_submit_is_a_conflict_and_does_not_rescore() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = ExamRepository::new(db.pool.clone(), db.writer.clone());
        let session = start(&repo, &["q1"]).await;

        repo.submit(submission(&session, vec![graded("q1", true)], 15.0))
            .await
            .unwrap();
        let again = repo
            .submit(submission(&session, vec![graded("q1", true)], 15.0))
            .await;
        assert!(matches!(again, Err(Error::Conflict(_))));

        let gam = crate::gamification::GamificationRepository::new(db.pool.clone(), db.writer.clone());
        use quizkit_core::gamification::GamificationRepositoryTrait;
        assert_eq!(gam.load("u1").unwrap().unwrap().xp, 15.0);
    }

    #[tokio::test]
    async fn perfect_exams_are_counted() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        let repo = ExamRepository::new(db.pool.clone(), db.writer.clone());

        let session = start(&repo, &["q1", "q2"]).await;
        let answers = vec![graded("q1", true), graded("q2", true)];
        repo.submit(submission(&session, answers, 20.0)).await.unwrap();

        assert_eq!(repo.perfect_exam_count("u1").unwrap(), 1);
        assert_eq!(repo.passed_exam_count("u1").unwrap(), 1);
    }
}
