use diesel::prelude::*;

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_activity_daily)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ActivityDailyDB {
    pub user_id: String,
    pub pool_id: String,
    pub activity_date: String,
    pub training_correct: i32,
    pub training_wrong: i32,
    pub leitner_correct: i32,
    pub exam_correct: i32,
    pub exam_total: i32,
    pub total_answered: i32,
}
