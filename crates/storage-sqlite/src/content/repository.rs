use std::collections::HashSet;
use std::sync::Arc;

use diesel::prelude::*;

use quizkit_core::content::ContentRepositoryTrait;
use quizkit_core::Result;

use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;

diesel::define_sql_function! {
    /// SQLite's RANDOM(), used for server-side sampling.
    fn random() -> Integer;
}

pub struct ContentRepository {
    pool: Arc<DbPool>,
}

impl ContentRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        ContentRepository { pool }
    }
}

impl ContentRepositoryTrait for ContentRepository {
    fn pool_exists(&self, pool: &str) -> Result<bool> {
        use crate::schema::pools::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let found: Option<String> = pools
            .find(pool)
            .select(id)
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(found.is_some())
    }

    fn question_pool(&self, question: &str) -> Result<Option<String>> {
        use crate::schema::questions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        questions
            .find(question)
            .select(pool_id)
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)
            .map_err(Into::into)
    }

    fn correct_answer_ids(&self, question: &str) -> Result<Option<HashSet<String>>> {
        use crate::schema::answers::dsl::*;
        use crate::schema::questions;

        let mut conn = get_connection(&self.pool)?;
        let exists: Option<String> = questions::table
            .find(question)
            .select(questions::id)
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        if exists.is_none() {
            return Ok(None);
        }

        let ids: Vec<String> = answers
            .filter(question_id.eq(question))
            .filter(is_correct.eq(true))
            .select(id)
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Ok(Some(ids.into_iter().collect()))
    }

    fn sample_question_ids(&self, pool: &str, count: usize) -> Result<Vec<String>> {
        use crate::schema::questions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        questions
            .filter(pool_id.eq(pool))
            .order(random())
            .limit(count as i64)
            .select(id)
            .load(&mut conn)
            .map_err(StorageError::from)
            .map_err(Into::into)
    }

    fn pool_question_ids(&self, pool: &str) -> Result<Vec<String>> {
        use crate::schema::questions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        questions
            .filter(pool_id.eq(pool))
            .order(id.asc())
            .select(id)
            .load(&mut conn)
            .map_err(StorageError::from)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_basic_content, setup_db};

    #[tokio::test]
    async fn sampling_stays_inside_the_pool() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 5);
        let repo = ContentRepository::new(db.pool.clone());

        assert!(repo.pool_exists("p1").unwrap());
        assert!(!repo.pool_exists("p2").unwrap());

        let sample = repo.sample_question_ids("p1", 3).unwrap();
        assert_eq!(sample.len(), 3);
        let all: HashSet<String> = repo.pool_question_ids("p1").unwrap().into_iter().collect();
        assert!(sample.iter().all(|q| all.contains(q)));

        // asking for more than exist returns what there is
        assert_eq!(repo.sample_question_ids("p1", 10).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn correct_answers_distinguish_missing_from_empty() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        crate::testing::insert_question(&mut conn, "p1", "q-none", &[]);
        let repo = ContentRepository::new(db.pool.clone());

        assert!(repo.correct_answer_ids("ghost").unwrap().is_none());
        let empty = repo.correct_answer_ids("q-none").unwrap().unwrap();
        assert!(empty.is_empty());
        let set = repo.correct_answer_ids("q1").unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("q1-a"));
        assert_eq!(repo.question_pool("q1").unwrap().as_deref(), Some("p1"));
    }
}
