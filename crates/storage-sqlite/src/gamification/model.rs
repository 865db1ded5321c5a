use diesel::prelude::*;

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_gamification)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GamificationDB {
    pub user_id: String,
    pub xp: f64,
    pub level: i32,
    pub last_awarded_at: Option<String>,
}
