use diesel::prelude::*;

use quizkit_core::speedrun::SpeedrunSession;
use quizkit_core::Result;

use crate::util::{parse_ts, parse_ts_opt};

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::speedrun_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SpeedrunSessionDB {
    pub id: String,
    pub user_id: String,
    pub pool_id: String,
    pub duration_minutes: i32,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub total_answered: i32,
    pub correct_count: i32,
    pub xp_awarded: f64,
}

impl SpeedrunSessionDB {
    pub fn into_domain(self) -> Result<SpeedrunSession> {
        Ok(SpeedrunSession {
            started_at: parse_ts(&self.started_at)?,
            finished_at: parse_ts_opt(self.finished_at.as_deref())?,
            id: self.id,
            user_id: self.user_id,
            pool_id: self.pool_id,
            duration_minutes: self.duration_minutes,
            total_answered: self.total_answered,
            correct_count: self.correct_count,
        })
    }
}
