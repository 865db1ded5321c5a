use diesel::prelude::*;

use quizkit_core::leitner::{LeitnerItem, LeitnerMode, LeitnerSet, SetSessionStats};
use quizkit_core::Result;

use crate::util::{parse_date, parse_ts, parse_ts_opt};

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::leitner_sets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LeitnerSetDB {
    pub id: String,
    pub user_id: String,
    pub pool_id: String,
    pub name: String,
    pub mode: String,
    pub created_at: String,
    pub session_count: i64,
    pub total_correct: i64,
    pub total_wrong: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_study_date: Option<String>,
}

impl LeitnerSetDB {
    pub fn into_domain(self) -> Result<LeitnerSet> {
        Ok(LeitnerSet {
            mode: LeitnerMode::parse(&self.mode)?,
            created_at: parse_ts(&self.created_at)?,
            session_stats: SetSessionStats {
                session_count: self.session_count,
                total_correct: self.total_correct,
                total_wrong: self.total_wrong,
                current_streak: self.current_streak,
                longest_streak: self.longest_streak,
                last_study_date: self.last_study_date.as_deref().map(parse_date).transpose()?,
            },
            id: self.id,
            user_id: self.user_id,
            pool_id: self.pool_id,
            name: self.name,
        })
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::leitner_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LeitnerItemDB {
    pub set_id: String,
    pub user_id: String,
    pub question_id: String,
    pub box_number: i32,
    pub due_at: Option<String>,
    pub last_answered_at: Option<String>,
}

impl LeitnerItemDB {
    pub fn into_domain(self) -> Result<LeitnerItem> {
        Ok(LeitnerItem {
            set_id: self.set_id,
            question_id: self.question_id,
            box_number: self.box_number,
            due_at: parse_ts_opt(self.due_at.as_deref())?,
            last_answered_at: parse_ts_opt(self.last_answered_at.as_deref())?,
        })
    }
}
