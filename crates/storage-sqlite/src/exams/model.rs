use diesel::prelude::*;

use quizkit_core::exams::ExamSession;
use quizkit_core::Result;

use crate::util::{from_json_list, parse_ts, parse_ts_opt};

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::exam_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExamSessionDB {
    pub id: String,
    pub user_id: String,
    pub pool_id: String,
    pub question_ids: String,
    pub question_count: i32,
    pub correct_answers: Option<i32>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

impl ExamSessionDB {
    pub fn into_domain(self) -> Result<ExamSession> {
        Ok(ExamSession {
            question_ids: from_json_list(&self.question_ids)?,
            started_at: parse_ts(&self.started_at)?,
            finished_at: parse_ts_opt(self.finished_at.as_deref())?,
            id: self.id,
            user_id: self.user_id,
            pool_id: self.pool_id,
            question_count: self.question_count,
            correct_answers: self.correct_answers,
        })
    }
}
