//! Shared test fixtures: a migrated temp-dir database plus content seeding.

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use tempfile::TempDir;

use crate::db::{self, DbPool, WriteHandle};
use crate::util::to_ts;

pub(crate) struct TestDb {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    _dir: TempDir,
}

pub(crate) async fn setup_db() -> TestDb {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let db_path = db::init(dir.path().to_str().unwrap()).unwrap();
    db::run_migrations(&db_path).unwrap();
    let pool = db::create_pool(&db_path).unwrap();
    let writer = db::spawn_writer(pool.clone());
    TestDb {
        pool,
        writer,
        _dir: dir,
    }
}

pub(crate) fn insert_user(conn: &mut SqliteConnection, user: &str, opt_in: bool) {
    use crate::schema::users::dsl::*;
    diesel::insert_into(users)
        .values((
            id.eq(user),
            display_name.eq(Some(user.to_uppercase())),
            leaderboard_opt_in.eq(opt_in),
            created_at.eq(to_ts(Utc::now())),
        ))
        .execute(conn)
        .unwrap();
}

pub(crate) fn insert_pool(conn: &mut SqliteConnection, pool: &str) {
    use crate::schema::pools::dsl::*;
    diesel::insert_into(pools)
        .values((id.eq(pool), name.eq(format!("pool {pool}"))))
        .execute(conn)
        .unwrap();
}

/// Inserts a question with answers `a`, `b`, `c`; ids of the listed answers
/// are marked correct. Answer ids are `{question}-a` etc.
pub(crate) fn insert_question(
    conn: &mut SqliteConnection,
    pool: &str,
    question: &str,
    correct: &[&str],
) {
    {
        use crate::schema::questions::dsl::*;
        diesel::insert_into(questions)
            .values((
                id.eq(question),
                pool_id.eq(pool),
                text.eq(format!("question {question}")),
            ))
            .execute(conn)
            .unwrap();
    }
    use crate::schema::answers::dsl::*;
    for suffix in ["a", "b", "c"] {
        let answer_id = format!("{question}-{suffix}");
        diesel::insert_into(answers)
            .values((
                id.eq(&answer_id),
                question_id.eq(question),
                text.eq(format!("answer {suffix}")),
                is_correct.eq(correct.contains(&suffix)),
            ))
            .execute(conn)
            .unwrap();
    }
}

/// A user plus a pool of `n` single-correct-answer questions `q1..qn`.
pub(crate) fn seed_basic_content(conn: &mut SqliteConnection, user: &str, pool: &str, n: usize) {
    insert_user(conn, user, true);
    insert_pool(conn, pool);
    for i in 1..=n {
        insert_question(conn, pool, &format!("q{i}"), &["a"]);
    }
}
