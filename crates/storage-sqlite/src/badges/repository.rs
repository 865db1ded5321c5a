use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use quizkit_core::badges::{BadgeRepositoryTrait, EarnedBadge};
use quizkit_core::Result;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::user_badges;
use crate::util::{parse_ts, to_ts};

pub struct BadgeRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BadgeRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        BadgeRepository { pool, writer }
    }
}

#[async_trait]
impl BadgeRepositoryTrait for BadgeRepository {
    async fn award(&self, user: &str, keys: &[&str]) -> Result<()> {
        use crate::schema::user_badges::dsl::*;

        let user = user.to_string();
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.writer
            .exec(move |conn| {
                let now = to_ts(Utc::now());
                let rows: Vec<_> = keys
                    .iter()
                    .map(|key| {
                        (
                            user_id.eq(user.clone()),
                            badge_key.eq(key.clone()),
                            earned_at.eq(now.clone()),
                        )
                    })
                    .collect();
                // Re-awarding keeps the original earned_at.
                diesel::insert_or_ignore_into(user_badges)
                    .values(&rows)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn earned(&self, user: &str) -> Result<Vec<EarnedBadge>> {
        use crate::schema::user_badges::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<(String, String)> = user_badges
            .filter(user_id.eq(user))
            .order(earned_at.asc())
            .select((badge_key, earned_at))
            .load(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|(key, ts)| {
                Ok(EarnedBadge {
                    key,
                    earned_at: parse_ts(&ts)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_db;

    #[tokio::test]
    async fn repeat_award_preserves_original_earned_at() {
        let db = setup_db().await;
        let repo = BadgeRepository::new(db.pool.clone(), db.writer.clone());

        repo.award("u1", &["erste_100"]).await.unwrap();
        let first = repo.earned("u1").unwrap();
        assert_eq!(first.len(), 1);

        repo.award("u1", &["erste_100", "konsequent"]).await.unwrap();
        let second = repo.earned("u1").unwrap();
        assert_eq!(second.len(), 2);
        let kept = second.iter().find(|b| b.key == "erste_100").unwrap();
        assert_eq!(kept.earned_at, first[0].earned_at);
    }

    #[tokio::test]
    async fn earned_is_scoped_to_the_user() {
        let db = setup_db().await;
        let repo = BadgeRepository::new(db.pool.clone(), db.writer.clone());

        repo.award("u1", &["duellant"]).await.unwrap();
        assert!(repo.earned("u2").unwrap().is_empty());
    }
}
