use std::sync::Arc;

use chrono::NaiveDate;
use diesel::prelude::*;

use quizkit_core::activity::{ActivityDelta, ActivityRepositoryTrait, DayTotals};
use quizkit_core::Result;

use super::model::ActivityDailyDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::user_activity_daily;
use crate::util::{parse_date, to_date};

/// Merges one delta into the (user, pool, date) row, creating it on first
/// contact. Runs as part of the enclosing scoring transaction, so callers
/// pass the transaction's connection.
pub fn merge_daily_activity(
    conn: &mut SqliteConnection,
    user: &str,
    pool: &str,
    date: NaiveDate,
    delta: &ActivityDelta,
) -> Result<()> {
    use crate::schema::user_activity_daily::dsl::*;

    let row = ActivityDailyDB {
        user_id: user.to_string(),
        pool_id: pool.to_string(),
        activity_date: to_date(date),
        training_correct: delta.training_correct,
        training_wrong: delta.training_wrong,
        leitner_correct: delta.leitner_correct,
        exam_correct: delta.exam_correct,
        exam_total: delta.exam_total,
        total_answered: delta.total_answered,
    };
    diesel::insert_into(user_activity_daily)
        .values(&row)
        .on_conflict((user_id, pool_id, activity_date))
        .do_update()
        .set((
            training_correct.eq(training_correct + delta.training_correct),
            training_wrong.eq(training_wrong + delta.training_wrong),
            leitner_correct.eq(leitner_correct + delta.leitner_correct),
            exam_correct.eq(exam_correct + delta.exam_correct),
            exam_total.eq(exam_total + delta.exam_total),
            total_answered.eq(total_answered + delta.total_answered),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

pub struct ActivityRepository {
    pool: Arc<DbPool>,
    #[allow(dead_code)]
    writer: WriteHandle,
}

impl ActivityRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ActivityRepository { pool, writer }
    }
}

impl ActivityRepositoryTrait for ActivityRepository {
    fn day_totals(&self, user: &str, since: NaiveDate) -> Result<DayTotals> {
        use crate::schema::user_activity_daily::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<(String, Option<i64>)> = user_activity_daily
            .filter(user_id.eq(user))
            .filter(activity_date.ge(to_date(since)))
            .group_by(activity_date)
            .select((activity_date, diesel::dsl::sum(total_answered)))
            .load(&mut conn)
            .map_err(StorageError::from)?;

        let mut totals = DayTotals::new();
        for (date_str, total) in rows {
            totals.insert(parse_date(&date_str)?, total.unwrap_or(0));
        }
        Ok(totals)
    }

    fn lifetime_correct_total(&self, user: &str) -> Result<i64> {
        use crate::schema::user_activity_daily::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let total: Option<i64> = user_activity_daily
            .filter(user_id.eq(user))
            .select(diesel::dsl::sum(
                training_correct + leitner_correct + exam_correct,
            ))
            .first(&mut conn)
            .map_err(StorageError::from)?;
        Ok(total.unwrap_or(0))
    }
}
