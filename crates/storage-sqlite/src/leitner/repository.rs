use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use quizkit_core::errors::Error;
use quizkit_core::leitner::{
    advance_box, box_interval_days, LeitnerAnswerOutcome, LeitnerAnswerRecord, LeitnerItem,
    LeitnerMode, LeitnerRepositoryTrait, LeitnerSet, LeitnerStats, NewLeitnerSet, BOX_MAX,
};
use quizkit_core::Result;

use super::model::{LeitnerItemDB, LeitnerSetDB};
use crate::activity::merge_daily_activity;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::gamification::{award_xp, load_snapshot};
use crate::schema::{leitner_items, leitner_milestones, leitner_sets};
use crate::util::{parse_ts, to_date, to_ts};

pub struct LeitnerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LeitnerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LeitnerRepository { pool, writer }
    }

    fn load_set_db(conn: &mut SqliteConnection, set: &str) -> Result<Option<LeitnerSetDB>> {
        leitner_sets::table
            .find(set)
            .first::<LeitnerSetDB>(conn)
            .optional()
            .map_err(StorageError::from)
            .map_err(Into::into)
    }

    fn items_query(
        conn: &mut SqliteConnection,
        set: &str,
        boxes: Option<Vec<i32>>,
        due_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<LeitnerItem>> {
        use crate::schema::leitner_items::dsl::*;

        let mut query = leitner_items.filter(set_id.eq(set)).into_boxed();
        if let Some(filter) = boxes {
            query = query.filter(box_number.eq_any(filter));
        }
        if let Some(now) = due_before {
            query = query.filter(due_at.is_null().or(due_at.le(to_ts(now))));
        }
        let rows = query
            .order((box_number.asc(), question_id.asc()))
            .load::<LeitnerItemDB>(conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(LeitnerItemDB::into_domain).collect()
    }
}

#[async_trait]
impl LeitnerRepositoryTrait for LeitnerRepository {
    fn load_set(&self, set: &str) -> Result<Option<LeitnerSet>> {
        let mut conn = get_connection(&self.pool)?;
        Self::load_set_db(&mut conn, set)?
            .map(LeitnerSetDB::into_domain)
            .transpose()
    }

    fn list_sets(&self, user: &str) -> Result<Vec<LeitnerSet>> {
        use crate::schema::leitner_sets::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows = leitner_sets
            .filter(user_id.eq(user))
            .order(created_at.asc())
            .load::<LeitnerSetDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(LeitnerSetDB::into_domain).collect()
    }

    async fn create_set(&self, new_set: NewLeitnerSet) -> Result<LeitnerSet> {
        self.writer
            .exec(move |conn| {
                use crate::schema::leitner_sets::dsl::*;

                let duplicate: Option<String> = leitner_sets
                    .filter(user_id.eq(&new_set.user_id))
                    .filter(pool_id.eq(&new_set.pool_id))
                    .filter(name.eq(&new_set.name))
                    .select(id)
                    .first(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if duplicate.is_some() {
                    return Err(Error::conflict(format!(
                        "set '{}' already exists for this pool",
                        new_set.name
                    )));
                }

                let row = LeitnerSetDB {
                    id: Uuid::new_v4().to_string(),
                    user_id: new_set.user_id,
                    pool_id: new_set.pool_id,
                    name: new_set.name,
                    mode: new_set.mode.as_str().to_string(),
                    created_at: to_ts(Utc::now()),
                    session_count: 0,
                    total_correct: 0,
                    total_wrong: 0,
                    current_streak: 0,
                    longest_streak: 0,
                    last_study_date: None,
                };
                diesel::insert_into(leitner_sets)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                row.into_domain()
            })
            .await
    }

    async fn delete_set(&self, set: &str) -> Result<()> {
        let set = set.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(leitner_sets::table.find(&set))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn seed(&self, set: &str, user: &str, question_ids: Vec<String>) -> Result<usize> {
        let set = set.to_string();
        let user = user.to_string();
        self.writer
            .exec(move |conn| {
                let set_db = Self::load_set_db(conn, &set)?
                    .ok_or_else(|| Error::not_found(format!("set {set}")))?;
                // Classic mode seeds immediately-due items.
                let due = match LeitnerMode::parse(&set_db.mode)? {
                    LeitnerMode::Classic => Some(to_ts(Utc::now())),
                    LeitnerMode::Simple => None,
                };
                let rows: Vec<LeitnerItemDB> = question_ids
                    .iter()
                    .map(|q| LeitnerItemDB {
                        set_id: set.clone(),
                        user_id: user.clone(),
                        question_id: q.clone(),
                        box_number: 1,
                        due_at: due.clone(),
                        last_answered_at: None,
                    })
                    .collect();
                let inserted = diesel::insert_or_ignore_into(leitner_items::table)
                    .values(&rows)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(inserted)
            })
            .await
    }

    async fn answer(&self, record: LeitnerAnswerRecord) -> Result<LeitnerAnswerOutcome> {
        self.writer
            .exec(move |conn| {
                use crate::schema::leitner_items::dsl::*;

                let now = Utc::now();
                let existing: Option<i32> = leitner_items
                    .find((&record.set_id, &record.question_id))
                    .select(box_number)
                    .first(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                // An unseeded question starts from box 1.
                let previous_box = existing.unwrap_or(1);
                let next_box = advance_box(previous_box, record.correct);
                let due = match record.mode {
                    LeitnerMode::Classic => {
                        Some(now + Duration::days(box_interval_days(next_box)))
                    }
                    LeitnerMode::Simple => None,
                };

                diesel::insert_into(leitner_items)
                    .values(LeitnerItemDB {
                        set_id: record.set_id.clone(),
                        user_id: record.user_id.clone(),
                        question_id: record.question_id.clone(),
                        box_number: next_box,
                        due_at: due.map(to_ts),
                        last_answered_at: Some(to_ts(now)),
                    })
                    .on_conflict((set_id, question_id))
                    .do_update()
                    .set((
                        box_number.eq(next_box),
                        due_at.eq(due.map(to_ts)),
                        last_answered_at.eq(Some(to_ts(now))),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                update_set_bookkeeping(conn, &record)?;
                merge_daily_activity(
                    conn,
                    &record.user_id,
                    &record.pool_id,
                    record.local_date,
                    &record.delta,
                )?;
                let snapshot = if record.xp > 0.0 {
                    award_xp(conn, &record.user_id, record.xp)?
                } else {
                    load_snapshot(conn, &record.user_id)?
                };

                Ok(LeitnerAnswerOutcome {
                    previous_box,
                    new_box: next_box,
                    due_at: due,
                    xp_awarded: record.xp,
                    xp: snapshot.xp,
                    level: snapshot.level,
                })
            })
            .await
    }

    fn due_items(
        &self,
        set: &str,
        boxes: Option<Vec<i32>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeitnerItem>> {
        let mut conn = get_connection(&self.pool)?;
        let set_db = Self::load_set_db(&mut conn, set)?
            .ok_or_else(|| Error::not_found(format!("set {set}")))?;
        let due_filter = match LeitnerMode::parse(&set_db.mode)? {
            LeitnerMode::Classic => Some(now),
            LeitnerMode::Simple => None,
        };
        Self::items_query(&mut conn, set, boxes, due_filter)
    }

    fn all_items(&self, set: &str, boxes: Option<Vec<i32>>) -> Result<Vec<LeitnerItem>> {
        let mut conn = get_connection(&self.pool)?;
        Self::items_query(&mut conn, set, boxes, None)
    }

    fn stats(&self, set: &str) -> Result<LeitnerStats> {
        use crate::schema::leitner_items::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<(i32, i64)> = leitner_items
            .filter(set_id.eq(set))
            .group_by(box_number)
            .select((box_number, diesel::dsl::count_star()))
            .load(&mut conn)
            .map_err(StorageError::from)?;

        let mut stats = LeitnerStats::default();
        for (b, count) in rows {
            if (1..=BOX_MAX).contains(&b) {
                stats.boxes[(b - 1) as usize] = count;
                stats.total += count;
            }
        }
        Ok(stats)
    }

    fn recorded_milestones(&self, set: &str) -> Result<Vec<i32>> {
        use crate::schema::leitner_milestones::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        leitner_milestones
            .filter(set_id.eq(set))
            .order(milestone.asc())
            .select(milestone)
            .load(&mut conn)
            .map_err(StorageError::from)
            .map_err(Into::into)
    }

    async fn record_milestone(&self, set: &str, user: &str, milestone_pct: i32) -> Result<bool> {
        let set = set.to_string();
        let user = user.to_string();
        self.writer
            .exec(move |conn| {
                use crate::schema::leitner_milestones::dsl::*;

                let set_db = Self::load_set_db(conn, &set)?
                    .ok_or_else(|| Error::not_found(format!("set {set}")))?;
                let created = parse_ts(&set_db.created_at)?;
                let days_since_start =
                    (Utc::now().date_naive() - created.date_naive()).num_days().max(0);

                let inserted = diesel::insert_or_ignore_into(leitner_milestones)
                    .values((
                        set_id.eq(&set),
                        user_id.eq(&user),
                        milestone.eq(milestone_pct),
                        session_count.eq(set_db.session_count),
                        days_taken.eq(days_since_start),
                        recorded_at.eq(to_ts(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(inserted > 0)
            })
            .await
    }

    async fn reset_items(&self, set: &str) -> Result<usize> {
        let set = set.to_string();
        self.writer
            .exec(move |conn| {
                use crate::schema::leitner_items::dsl::*;
                diesel::delete(leitner_items.filter(set_id.eq(&set)))
                    .execute(conn)
                    .map_err(StorageError::from)
                    .map_err(Into::into)
            })
            .await
    }

    fn box5_count(&self, user: &str) -> Result<i64> {
        use crate::schema::leitner_items::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        leitner_items
            .filter(user_id.eq(user))
            .filter(box_number.eq(BOX_MAX))
            .count()
            .get_result(&mut conn)
            .map_err(StorageError::from)
            .map_err(Into::into)
    }
}

/// Per-answer set bookkeeping: totals, and a study-day streak that advances
/// once per new local date.
fn update_set_bookkeeping(conn: &mut SqliteConnection, record: &LeitnerAnswerRecord) -> Result<()> {
    use crate::schema::leitner_sets::dsl::*;

    let set_db: LeitnerSetDB = leitner_sets
        .find(&record.set_id)
        .first(conn)
        .map_err(StorageError::from)?;

    let today = to_date(record.local_date);
    let yesterday = to_date(record.local_date - Duration::days(1));
    let (new_sessions, new_current) = match set_db.last_study_date.as_deref() {
        Some(last) if last == today => (set_db.session_count, set_db.current_streak),
        Some(last) if last == yesterday => (set_db.session_count + 1, set_db.current_streak + 1),
        _ => (set_db.session_count + 1, 1),
    };
    let new_longest = set_db.longest_streak.max(new_current);

    diesel::update(leitner_sets.find(&record.set_id))
        .set((
            session_count.eq(new_sessions),
            total_correct.eq(set_db.total_correct + record.correct as i64),
            total_wrong.eq(set_db.total_wrong + !record.correct as i64),
            current_streak.eq(new_current),
            longest_streak.eq(new_longest),
            last_study_date.eq(Some(today)),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_basic_content, setup_db};
    use chrono::NaiveDate;
    use quizkit_core::activity::ActivityDelta;

    async fn make_set(repo: &LeitnerRepository, mode: LeitnerMode) -> LeitnerSet {
        repo.create_set(NewLeitnerSet {
            user_id: "u1".to_string(),
            pool_id: "p1".to_string(),
            name: format!("{} set", mode.as_str()),
            mode,
        })
        .await
        .unwrap()
    }

    fn answer(set: &LeitnerSet, question: &str, correct: bool) -> LeitnerAnswerRecord {
        LeitnerAnswerRecord {
            set_id: set.id.clone(),
            user_id: "u1".to_string(),
            pool_id: "p1".to_string(),
            question_id: question.to_string(),
            correct,
            mode: set.mode,
            local_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            xp: if correct { 2.0 } else { 0.0 },
            delta: ActivityDelta::leitner(correct),
        }
    }

    #[tokio::test]
    async fn duplicate_set_name_is_a_conflict() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 3);
        let repo = LeitnerRepository::new(db.pool.clone(), db.writer.clone());

        make_set(&repo, LeitnerMode::Simple).await;
        let dup = repo
            .create_set(NewLeitnerSet {
                user_id: "u1".to_string(),
                pool_id: "p1".to_string(),
                name: "simple set".to_string(),
                mode: LeitnerMode::Simple,
            })
            .await;
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 3);
        let repo = LeitnerRepository::new(db.pool.clone(), db.writer.clone());
        let set = make_set(&repo, LeitnerMode::Classic).await;

        let qs = vec!["q1".to_string(), "q2".to_string(), "q3".to_string()];
        assert_eq!(repo.seed(&set.id, "u1", qs.clone()).await.unwrap(), 3);
        assert_eq!(repo.seed(&set.id, "u1", qs).await.unwrap(), 0);

        // classic seeding makes everything due immediately
        let due = repo.due_items(&set.id, None, Utc::now()).unwrap();
        assert_eq!(due.len(), 3);
        assert!(due.iter().all(|i| i.box_number == 1));
    }

    #[tokio::test]
    async fn correct_answer_moves_up_with_classic_interval() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = LeitnerRepository::new(db.pool.clone(), db.writer.clone());
        let set = make_set(&repo, LeitnerMode::Classic).await;
        repo.seed(&set.id, "u1", vec!["q1".to_string()]).await.unwrap();

        let before = Utc::now();
        let outcome = repo.answer(answer(&set, "q1", true)).await.unwrap();
        assert_eq!(outcome.previous_box, 1);
        assert_eq!(outcome.new_box, 2);
        assert_eq!(outcome.xp_awarded, 2.0);
        let due = outcome.due_at.unwrap();
        let days = (due - before).num_days();
        assert!((1..=2).contains(&days), "box 2 due in ~2 days, got {days}");

        // the item is no longer due now
        assert!(repo.due_items(&set.id, None, Utc::now()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_answer_in_box_one_stays_and_awards_nothing() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = LeitnerRepository::new(db.pool.clone(), db.writer.clone());
        let set = make_set(&repo, LeitnerMode::Simple).await;
        repo.seed(&set.id, "u1", vec!["q1".to_string()]).await.unwrap();

        let outcome = repo.answer(answer(&set, "q1", false)).await.unwrap();
        assert_eq!(outcome.new_box, 1);
        assert_eq!(outcome.xp_awarded, 0.0);
        assert_eq!(outcome.xp, 0.0);
        // simple mode never sets a due date
        assert!(outcome.due_at.is_none());
    }

    #[tokio::test]
    async fn milestone_records_once() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = LeitnerRepository::new(db.pool.clone(), db.writer.clone());
        let set = make_set(&repo, LeitnerMode::Simple).await;

        assert!(repo.record_milestone(&set.id, "u1", 25).await.unwrap());
        assert!(!repo.record_milestone(&set.id, "u1", 25).await.unwrap());
        assert_eq!(repo.recorded_milestones(&set.id).unwrap(), vec![25]);
    }

    #[tokio::test]
    async fn stats_and_box5_count_follow_answers() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        let repo = LeitnerRepository::new(db.pool.clone(), db.writer.clone());
        let set = make_set(&repo, LeitnerMode::Simple).await;
        repo.seed(&set.id, "u1", vec!["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();

        for _ in 0..4 {
            repo.answer(answer(&set, "q1", true)).await.unwrap();
        }
        let stats = repo.stats(&set.id).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.boxes[4], 1);
        assert_eq!(stats.boxes[0], 1);
        assert_eq!(repo.box5_count("u1").unwrap(), 1);

        assert_eq!(repo.reset_items(&set.id).await.unwrap(), 2);
        assert_eq!(repo.stats(&set.id).unwrap().total, 0);
    }
}
