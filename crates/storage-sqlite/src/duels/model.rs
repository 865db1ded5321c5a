use diesel::prelude::*;

use quizkit_core::duels::{Duel, DuelAnswer, DuelResult, DuelStatus};
use quizkit_core::Result;

use crate::util::{from_json_list, parse_ts, parse_ts_opt};

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::duels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DuelDB {
    pub id: String,
    pub challenger_id: String,
    pub opponent_id: Option<String>,
    pub pool_id: String,
    pub question_count: i32,
    pub question_ids: String,
    pub status: String,
    pub is_open: bool,
    pub expires_at: String,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl DuelDB {
    pub fn into_domain(self) -> Result<Duel> {
        Ok(Duel {
            question_ids: from_json_list(&self.question_ids)?,
            status: DuelStatus::parse(&self.status)?,
            expires_at: parse_ts(&self.expires_at)?,
            created_at: parse_ts(&self.created_at)?,
            finished_at: parse_ts_opt(self.finished_at.as_deref())?,
            id: self.id,
            challenger_id: self.challenger_id,
            opponent_id: self.opponent_id,
            pool_id: self.pool_id,
            question_count: self.question_count,
            is_open: self.is_open,
        })
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::duel_answers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DuelAnswerDB {
    pub duel_id: String,
    pub user_id: String,
    pub question_id: String,
    pub selected_answer_ids: String,
    pub is_correct: bool,
    pub time_ms: i64,
    pub answered_at: String,
}

impl DuelAnswerDB {
    pub fn into_domain(self) -> Result<DuelAnswer> {
        Ok(DuelAnswer {
            selected_answer_ids: from_json_list(&self.selected_answer_ids)?,
            answered_at: parse_ts(&self.answered_at)?,
            user_id: self.user_id,
            question_id: self.question_id,
            is_correct: self.is_correct,
            time_ms: self.time_ms,
        })
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::duel_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DuelResultDB {
    pub duel_id: String,
    pub user_id: String,
    pub correct_count: i32,
    pub total_time_ms: i64,
    pub is_winner: Option<bool>,
    pub xp_earned: f64,
}

impl From<DuelResultDB> for DuelResult {
    fn from(db: DuelResultDB) -> Self {
        DuelResult {
            user_id: db.user_id,
            correct_count: db.correct_count,
            total_time_ms: db.total_time_ms,
            is_winner: db.is_winner,
            xp_earned: db.xp_earned,
        }
    }
}
