use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use quizkit_core::content::exact_set_match;
use quizkit_core::duels::{
    resolve, winner_flags, xp_for, AnswerOutcome, AnswerSubmission, Duel, DuelDetail,
    DuelListEntry, DuelRepositoryTrait, DuelResult, DuelStats, DuelStatus, NewDuel, OpenDuelEntry,
    ParticipantScore, MAX_OPEN_DUELS_PER_USER,
};
use quizkit_core::errors::Error;
use quizkit_core::gamification::DuelXpRules;
use quizkit_core::Result;

use super::model::{DuelAnswerDB, DuelDB, DuelResultDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::gamification::award_xp;
use crate::schema::{duel_answers, duel_results, duels};
use crate::util::{to_json_list, to_ts};

pub struct DuelRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl DuelRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        DuelRepository { pool, writer }
    }

    fn load_db(conn: &mut SqliteConnection, duel: &str) -> Result<Option<DuelDB>> {
        duels::table
            .find(duel)
            .first::<DuelDB>(conn)
            .optional()
            .map_err(StorageError::from)
            .map_err(Into::into)
    }

    fn results_for(conn: &mut SqliteConnection, duel: &str) -> Result<Vec<DuelResultDB>> {
        duel_results::table
            .filter(duel_results::duel_id.eq(duel))
            .load::<DuelResultDB>(conn)
            .map_err(StorageError::from)
            .map_err(Into::into)
    }
}

#[async_trait]
impl DuelRepositoryTrait for DuelRepository {
    fn load(&self, duel: &str) -> Result<Option<Duel>> {
        let mut conn = get_connection(&self.pool)?;
        Self::load_db(&mut conn, duel)?.map(DuelDB::into_domain).transpose()
    }

    async fn create(&self, new_duel: NewDuel) -> Result<Duel> {
        self.writer
            .exec(move |conn| {
                // The cap check runs under the writer lock; concurrent
                // creates are serialized and cannot both slip under it.
                let open: i64 = duels::table
                    .filter(duels::challenger_id.eq(&new_duel.challenger_id))
                    .filter(duels::status.eq_any(["waiting", "active"]))
                    .count()
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                if open >= MAX_OPEN_DUELS_PER_USER {
                    return Err(Error::conflict("too many open duels"));
                }

                let row = DuelDB {
                    id: Uuid::new_v4().to_string(),
                    challenger_id: new_duel.challenger_id,
                    opponent_id: new_duel.opponent_id,
                    pool_id: new_duel.pool_id,
                    question_count: new_duel.question_count,
                    question_ids: to_json_list(&new_duel.question_ids)?,
                    status: DuelStatus::Waiting.as_str().to_string(),
                    is_open: new_duel.is_open,
                    expires_at: to_ts(new_duel.expires_at),
                    created_at: to_ts(Utc::now()),
                    finished_at: None,
                };
                diesel::insert_into(duels::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                row.into_domain()
            })
            .await
    }

    async fn accept(&self, duel: &str, user: &str) -> Result<bool> {
        use crate::schema::duels::dsl::*;

        let duel = duel.to_string();
        let user = user.to_string();
        self.writer
            .exec(move |conn| {
                // Conditional update: under concurrent acceptors exactly one
                // matches the waiting-state filter.
                let affected = diesel::update(
                    duels
                        .find(&duel)
                        .filter(status.eq(DuelStatus::Waiting.as_str()))
                        .filter(challenger_id.ne(&user))
                        .filter(opponent_id.is_null().or(opponent_id.eq(&user))),
                )
                .set((
                    opponent_id.eq(Some(user.clone())),
                    status.eq(DuelStatus::Active.as_str()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }

    async fn submit_answer(&self, submission: AnswerSubmission) -> Result<AnswerOutcome> {
        self.writer
            .exec(move |conn| {
                let duel_db = Self::load_db(conn, &submission.duel_id)?
                    .ok_or_else(|| Error::not_found(format!("duel {}", submission.duel_id)))?;
                let duel_status = DuelStatus::parse(&duel_db.status)?;
                if duel_status.is_terminal() {
                    return Err(Error::conflict(format!("duel is {duel_status}")));
                }

                // One answer per (duel, user, question); the primary key is
                // the backstop, this check gives the clean error.
                let already: i64 = duel_answers::table
                    .filter(duel_answers::duel_id.eq(&submission.duel_id))
                    .filter(duel_answers::user_id.eq(&submission.user_id))
                    .filter(duel_answers::question_id.eq(&submission.question_id))
                    .count()
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                if already > 0 {
                    return Err(Error::conflict("question already answered in this duel"));
                }

                let correct_set: HashSet<String> = {
                    use crate::schema::answers::dsl::*;
                    answers
                        .filter(question_id.eq(&submission.question_id))
                        .filter(is_correct.eq(true))
                        .select(id)
                        .load::<String>(conn)
                        .map_err(StorageError::from)?
                        .into_iter()
                        .collect()
                };
                let correct = exact_set_match(&submission.selected_answer_ids, &correct_set);

                diesel::insert_into(duel_answers::table)
                    .values(DuelAnswerDB {
                        duel_id: submission.duel_id.clone(),
                        user_id: submission.user_id.clone(),
                        question_id: submission.question_id.clone(),
                        selected_answer_ids: to_json_list(&submission.selected_answer_ids)?,
                        is_correct: correct,
                        time_ms: submission.time_ms,
                        answered_at: to_ts(Utc::now()),
                    })
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let answered: i64 = duel_answers::table
                    .filter(duel_answers::duel_id.eq(&submission.duel_id))
                    .filter(duel_answers::user_id.eq(&submission.user_id))
                    .count()
                    .get_result(conn)
                    .map_err(StorageError::from)?;

                if answered >= duel_db.question_count as i64 {
                    materialize_result(conn, &submission.duel_id, &submission.user_id)?;
                }
                let finished = maybe_resolve(conn, &duel_db)?;

                Ok(AnswerOutcome {
                    correct,
                    answered,
                    finished,
                })
            })
            .await
    }

    fn list_for(&self, user: &str, filter: Option<DuelStatus>) -> Result<Vec<DuelListEntry>> {
        use crate::schema::duels::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let mut query = duels
            .filter(challenger_id.eq(user).or(opponent_id.eq(user)))
            .into_boxed();
        if let Some(s) = filter {
            query = query.filter(status.eq(s.as_str()));
        }
        let rows = query
            .order(created_at.desc())
            .load::<DuelDB>(&mut conn)
            .map_err(StorageError::from)?;

        let ids: Vec<String> = rows.iter().map(|d| d.id.clone()).collect();
        let my_results: HashMap<String, DuelResultDB> = duel_results::table
            .filter(duel_results::duel_id.eq_any(&ids))
            .filter(duel_results::user_id.eq(user))
            .load::<DuelResultDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|r| (r.duel_id.clone(), r))
            .collect();

        rows.into_iter()
            .map(|row| {
                let my_result = my_results.get(&row.id).cloned().map(DuelResult::from);
                let domain = row.into_domain()?;
                // show the other participant from the viewer's side
                let other = if domain.challenger_id == user {
                    domain.opponent_id.clone()
                } else {
                    Some(domain.challenger_id.clone())
                };
                Ok(DuelListEntry {
                    id: domain.id,
                    status: domain.status,
                    pool_id: domain.pool_id,
                    question_count: domain.question_count,
                    is_open: domain.is_open,
                    opponent_id: other,
                    expires_at: domain.expires_at,
                    created_at: domain.created_at,
                    finished_at: domain.finished_at,
                    my_result,
                })
            })
            .collect()
    }

    fn list_open(&self, user: &str) -> Result<Vec<OpenDuelEntry>> {
        use crate::schema::duels::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows = duels
            .filter(status.eq(DuelStatus::Waiting.as_str()))
            .filter(is_open.eq(true))
            .filter(opponent_id.is_null())
            .filter(challenger_id.ne(user))
            .filter(expires_at.gt(to_ts(Utc::now())))
            .order(created_at.desc())
            .load::<DuelDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| {
                let domain = row.into_domain()?;
                Ok(OpenDuelEntry {
                    id: domain.id,
                    pool_id: domain.pool_id,
                    question_count: domain.question_count,
                    challenger_id: domain.challenger_id,
                    expires_at: domain.expires_at,
                    created_at: domain.created_at,
                })
            })
            .collect()
    }

    fn detail(&self, duel: &str, viewer: &str) -> Result<Option<DuelDetail>> {
        let mut conn = get_connection(&self.pool)?;
        let Some(duel_db) = Self::load_db(&mut conn, duel)? else {
            return Ok(None);
        };
        let domain = duel_db.into_domain()?;

        // Opponent answers stay hidden until the duel is finished.
        let mut answers_query = duel_answers::table
            .filter(duel_answers::duel_id.eq(duel))
            .into_boxed();
        if domain.status != DuelStatus::Finished {
            answers_query = answers_query.filter(duel_answers::user_id.eq(viewer));
        }
        let answer_rows = answers_query
            .order(duel_answers::answered_at.asc())
            .load::<DuelAnswerDB>(&mut conn)
            .map_err(StorageError::from)?;
        let answers = answer_rows
            .into_iter()
            .map(DuelAnswerDB::into_domain)
            .collect::<Result<Vec<_>>>()?;
        let results = Self::results_for(&mut conn, duel)?
            .into_iter()
            .map(DuelResult::from)
            .collect();

        Ok(Some(DuelDetail {
            duel: domain,
            answers,
            results,
        }))
    }

    async fn delete(&self, duel: &str) -> Result<()> {
        let duel = duel.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(duels::table.find(&duel))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn reset_for(&self, user: &str) -> Result<usize> {
        use crate::schema::duels::dsl::*;

        let user = user.to_string();
        self.writer
            .exec(move |conn| {
                let created_non_active = challenger_id
                    .eq(&user)
                    .and(status.ne(DuelStatus::Active.as_str()));
                let joined_terminal = opponent_id
                    .eq(&user)
                    .and(status.eq_any(["finished", "expired"]));
                diesel::delete(duels.filter(created_non_active.or(joined_terminal)))
                    .execute(conn)
                    .map_err(StorageError::from)
                    .map_err(Into::into)
            })
            .await
    }

    fn stats_for(&self, user: &str) -> Result<DuelStats> {
        use crate::schema::duels::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let finished: Vec<DuelDB> = duels
            .filter(status.eq(DuelStatus::Finished.as_str()))
            .filter(challenger_id.eq(user).or(opponent_id.eq(user)))
            .order(finished_at.asc())
            .load(&mut conn)
            .map_err(StorageError::from)?;

        let ids: Vec<String> = finished.iter().map(|d| d.id.clone()).collect();
        let my_results: HashMap<String, Option<bool>> = duel_results::table
            .filter(duel_results::duel_id.eq_any(&ids))
            .filter(duel_results::user_id.eq(user))
            .select((duel_results::duel_id, duel_results::is_winner))
            .load::<(String, Option<bool>)>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .collect();

        let mut stats = DuelStats::default();
        let mut opponents: HashSet<String> = HashSet::new();
        let mut run = 0;
        for duel_db in &finished {
            stats.played += 1;
            let other = if duel_db.challenger_id == user {
                duel_db.opponent_id.clone()
            } else {
                Some(duel_db.challenger_id.clone())
            };
            if let Some(other) = other {
                opponents.insert(other);
            }
            match my_results.get(&duel_db.id).copied().flatten() {
                Some(true) => {
                    stats.wins += 1;
                    run += 1;
                    stats.best_win_streak = stats.best_win_streak.max(run);
                }
                Some(false) => {
                    stats.losses += 1;
                    run = 0;
                }
                None => {
                    stats.draws += 1;
                    run = 0;
                }
            }
        }
        stats.current_win_streak = run;
        stats.distinct_opponents = opponents.len() as i64;
        Ok(stats)
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<usize> {
        use crate::schema::duels::dsl::*;

        self.writer
            .exec(move |conn| {
                let due: Vec<DuelDB> = duels
                    .filter(status.eq_any(["waiting", "active"]))
                    .filter(expires_at.le(to_ts(now)))
                    .load(conn)
                    .map_err(StorageError::from)?;

                let rules = DuelXpRules::standard();
                let mut expired = 0;
                for duel_db in due {
                    // Re-filter on status so a concurrent sweep or a racing
                    // resolution can't double-award.
                    let affected = diesel::update(
                        duels
                            .find(&duel_db.id)
                            .filter(status.eq_any(["waiting", "active"])),
                    )
                    .set(status.eq(DuelStatus::Expired.as_str()))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                    if affected == 0 {
                        continue;
                    }
                    award_xp(conn, &duel_db.challenger_id, rules.expired)?;
                    if let Some(opponent) = &duel_db.opponent_id {
                        award_xp(conn, opponent, rules.expired)?;
                    }
                    expired += 1;
                }
                Ok(expired)
            })
            .await
    }
}

/// Inserts the participant's result row once all questions are answered.
/// Insert-or-ignore keeps it single-shot.
fn materialize_result(conn: &mut SqliteConnection, duel: &str, user: &str) -> Result<()> {
    let rows: Vec<(bool, i64)> = duel_answers::table
        .filter(duel_answers::duel_id.eq(duel))
        .filter(duel_answers::user_id.eq(user))
        .select((duel_answers::is_correct, duel_answers::time_ms))
        .load(conn)
        .map_err(StorageError::from)?;
    let correct_count = rows.iter().filter(|(c, _)| *c).count() as i32;
    let total_time: i64 = rows.iter().map(|(_, t)| t).sum();

    diesel::insert_or_ignore_into(duel_results::table)
        .values(DuelResultDB {
            duel_id: duel.to_string(),
            user_id: user.to_string(),
            correct_count,
            total_time_ms: total_time,
            is_winner: None,
            xp_earned: 0.0,
        })
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

/// Resolves the duel when both results exist and it is not yet finished.
/// The status filter on the final update guarantees resolution runs once.
fn maybe_resolve(conn: &mut SqliteConnection, duel_db: &DuelDB) -> Result<bool> {
    use crate::schema::duels::dsl::*;

    let Some(opponent) = duel_db.opponent_id.as_deref() else {
        return Ok(false);
    };
    let results: HashMap<String, DuelResultDB> = duel_results::table
        .filter(duel_results::duel_id.eq(&duel_db.id))
        .load::<DuelResultDB>(conn)
        .map_err(StorageError::from)?
        .into_iter()
        .map(|r| (r.user_id.clone(), r))
        .collect();
    let (Some(challenger_result), Some(opponent_result)) =
        (results.get(&duel_db.challenger_id), results.get(opponent))
    else {
        return Ok(false);
    };

    let affected = diesel::update(
        duels
            .find(&duel_db.id)
            .filter(status.eq_any(["waiting", "active"])),
    )
    .set((
        status.eq(DuelStatus::Finished.as_str()),
        finished_at.eq(Some(to_ts(Utc::now()))),
    ))
    .execute(conn)
    .map_err(StorageError::from)?;
    if affected == 0 {
        return Ok(false);
    }

    let outcome = resolve(
        &ParticipantScore {
            user_id: challenger_result.user_id.clone(),
            correct_count: challenger_result.correct_count,
            total_time_ms: challenger_result.total_time_ms,
        },
        &ParticipantScore {
            user_id: opponent_result.user_id.clone(),
            correct_count: opponent_result.correct_count,
            total_time_ms: opponent_result.total_time_ms,
        },
    );
    let (challenger_flag, opponent_flag) = winner_flags(outcome);
    let rules = DuelXpRules::standard();

    for (participant, flag) in [
        (duel_db.challenger_id.as_str(), challenger_flag),
        (opponent, opponent_flag),
    ] {
        let earned = xp_for(flag, &rules);
        diesel::update(
            duel_results::table
                .filter(duel_results::duel_id.eq(&duel_db.id))
                .filter(duel_results::user_id.eq(participant)),
        )
        .set((
            duel_results::is_winner.eq(flag),
            duel_results::xp_earned.eq(earned),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
        award_xp(conn, participant, earned)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentRepository;
    use crate::testing::{insert_user, seed_basic_content, setup_db, TestDb};
    use chrono::Duration;
    use quizkit_core::audit::noop_sink;
    use quizkit_core::duels::DuelService;

    fn duel_service(db: &TestDb) -> DuelService {
        DuelService::new(
            Arc::new(DuelRepository::new(db.pool.clone(), db.writer.clone())),
            Arc::new(ContentRepository::new(db.pool.clone())),
            noop_sink(),
        )
    }

    fn new_duel(challenger: &str, opponent: Option<&str>, questions: &[&str]) -> NewDuel {
        NewDuel {
            challenger_id: challenger.to_string(),
            opponent_id: opponent.map(|o| o.to_string()),
            pool_id: "p1".to_string(),
            question_count: questions.len() as i32,
            question_ids: questions.iter().map(|q| q.to_string()).collect(),
            is_open: opponent.is_none(),
            expires_at: Utc::now() + Duration::hours(48),
        }
    }

    fn submission(duel: &Duel, user: &str, question: &str, answer: &str, time: i64) -> AnswerSubmission {
        AnswerSubmission {
            duel_id: duel.id.clone(),
            user_id: user.to_string(),
            question_id: question.to_string(),
            selected_answer_ids: vec![format!("{question}-{answer}")],
            time_ms: time,
        }
    }

    async fn play_duel(repo: &DuelRepository) -> Duel {
        let duel = repo.create(new_duel("u1", None, &["q1", "q2"])).await.unwrap();
        assert!(repo.accept(&duel.id, "u2").await.unwrap());
        duel
    }

    #[tokio::test]
    async fn accept_race_has_one_winner() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        insert_user(&mut conn, "u2", true);
        insert_user(&mut conn, "u3", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());

        let duel = repo.create(new_duel("u1", None, &["q1", "q2"])).await.unwrap();
        assert!(repo.accept(&duel.id, "u2").await.unwrap());
        assert!(!repo.accept(&duel.id, "u3").await.unwrap());
        assert!(!repo.accept(&duel.id, "u2").await.unwrap());

        let loaded = repo.load(&duel.id).unwrap().unwrap();
        assert_eq!(loaded.status, DuelStatus::Active);
        assert_eq!(loaded.opponent_id.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn duplicate_answer_is_a_conflict_without_score_change() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        insert_user(&mut conn, "u2", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());
        let duel = play_duel(&repo).await;

        let first = repo.submit_answer(submission(&duel, "u1", "q1", "a", 1000)).await.unwrap();
        assert!(first.correct);
        assert_eq!(first.answered, 1);

        let dup = repo.submit_answer(submission(&duel, "u1", "q1", "b", 500)).await;
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let detail = repo.detail(&duel.id, "u1").unwrap().unwrap();
        assert_eq!(detail.answers.len(), 1);
        assert!(detail.answers[0].is_correct);
    }

    #[tokio::test]
    async fn resolution_runs_once_with_count_then_time() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        insert_user(&mut conn, "u2", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());
        let duel = play_duel(&repo).await;

        // u1: both correct, slow. u2: both correct, fast. u2 wins on time.
        repo.submit_answer(submission(&duel, "u1", "q1", "a", 50_000)).await.unwrap();
        repo.submit_answer(submission(&duel, "u1", "q2", "a", 50_000)).await.unwrap();
        repo.submit_answer(submission(&duel, "u2", "q1", "a", 1_000)).await.unwrap();
        let last = repo.submit_answer(submission(&duel, "u2", "q2", "a", 1_000)).await.unwrap();
        assert!(last.finished);

        let loaded = repo.load(&duel.id).unwrap().unwrap();
        assert_eq!(loaded.status, DuelStatus::Finished);
        assert!(loaded.finished_at.is_some());

        let detail = repo.detail(&duel.id, "u1").unwrap().unwrap();
        let winner = detail.results.iter().find(|r| r.user_id == "u2").unwrap();
        let loser = detail.results.iter().find(|r| r.user_id == "u1").unwrap();
        assert_eq!(winner.is_winner, Some(true));
        assert_eq!(winner.xp_earned, 20.0);
        assert_eq!(loser.is_winner, Some(false));
        assert_eq!(loser.xp_earned, 5.0);

        // finished duels show both participants' answers
        assert_eq!(detail.answers.len(), 4);

        let stats = repo.stats_for("u2").unwrap();
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.played, 1);
        assert_eq!(stats.distinct_opponents, 1);
        assert_eq!(stats.current_win_streak, 1);
    }

    #[tokio::test]
    async fn draw_leaves_winner_flags_null() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        insert_user(&mut conn, "u2", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());
        let duel = repo.create(new_duel("u1", Some("u2"), &["q1"])).await.unwrap();
        repo.accept(&duel.id, "u2").await.unwrap();

        repo.submit_answer(submission(&duel, "u1", "q1", "a", 2_000)).await.unwrap();
        repo.submit_answer(submission(&duel, "u2", "q1", "a", 2_000)).await.unwrap();

        let detail = repo.detail(&duel.id, "u1").unwrap().unwrap();
        assert!(detail.results.iter().all(|r| r.is_winner.is_none()));
        assert!(detail.results.iter().all(|r| r.xp_earned == 10.0));

        let stats = repo.stats_for("u1").unwrap();
        assert_eq!(stats.draws, 1);
    }

    #[tokio::test]
    async fn expiry_sweep_is_idempotent() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        insert_user(&mut conn, "u2", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());

        let mut overdue = new_duel("u1", Some("u2"), &["q1"]);
        overdue.expires_at = Utc::now() - Duration::hours(1);
        let duel = repo.create(overdue).await.unwrap();
        repo.accept(&duel.id, "u2").await.unwrap();

        assert_eq!(repo.expire_due(Utc::now()).await.unwrap(), 1);
        assert_eq!(repo.expire_due(Utc::now()).await.unwrap(), 0);

        let loaded = repo.load(&duel.id).unwrap().unwrap();
        assert_eq!(loaded.status, DuelStatus::Expired);

        // both participants got the flat expiry XP exactly once
        let gam = crate::gamification::GamificationRepository::new(db.pool.clone(), db.writer.clone());
        use quizkit_core::gamification::GamificationRepositoryTrait;
        assert_eq!(gam.load("u1").unwrap().unwrap().xp, 5.0);
        assert_eq!(gam.load("u2").unwrap().unwrap().xp, 5.0);
    }

    #[tokio::test]
    async fn reset_spares_active_duels() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 2);
        insert_user(&mut conn, "u2", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());

        let waiting = repo.create(new_duel("u1", None, &["q1"])).await.unwrap();
        let active = repo.create(new_duel("u1", Some("u2"), &["q1"])).await.unwrap();
        repo.accept(&active.id, "u2").await.unwrap();

        assert_eq!(repo.reset_for("u1").await.unwrap(), 1);
        assert!(repo.load(&waiting.id).unwrap().is_none());
        assert!(repo.load(&active.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn open_list_hides_own_and_fixed_duels() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        insert_user(&mut conn, "u2", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());

        repo.create(new_duel("u1", None, &["q1"])).await.unwrap();
        repo.create(new_duel("u1", Some("u2"), &["q1"])).await.unwrap();

        assert_eq!(repo.list_open("u2").unwrap().len(), 1);
        assert!(repo.list_open("u1").unwrap().is_empty());

        let mine = repo.list_for("u1", None).unwrap();
        assert_eq!(mine.len(), 2);
        let waiting_only = repo.list_for("u1", Some(DuelStatus::Waiting)).unwrap();
        assert_eq!(waiting_only.len(), 2);
    }

    #[tokio::test]
    async fn open_duel_cap_is_enforced_inside_the_insert_transaction() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());

        for _ in 0..MAX_OPEN_DUELS_PER_USER {
            repo.create(new_duel("u1", None, &["q1"])).await.unwrap();
        }
        let over = repo.create(new_duel("u1", None, &["q1"])).await;
        assert!(matches!(over, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn lost_accept_gets_a_precise_rejection() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 1);
        insert_user(&mut conn, "u2", true);
        insert_user(&mut conn, "u3", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());
        let svc = duel_service(&db);

        let open = repo.create(new_duel("u1", None, &["q1"])).await.unwrap();
        let own = svc.accept(&open.id, "u1").await;
        assert!(matches!(own, Err(Error::Validation(_))));

        svc.accept(&open.id, "u2").await.unwrap();
        // the duel is active now, so a later acceptor sees a conflict
        let late = svc.accept(&open.id, "u3").await;
        assert!(matches!(late, Err(Error::Conflict(_))));

        let missing = svc.accept("ghost", "u2").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let reserved = repo.create(new_duel("u1", Some("u2"), &["q1"])).await.unwrap();
        let intruder = svc.accept(&reserved.id, "u3").await;
        assert!(matches!(intruder, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn answer_submission_hits_every_rejection_guard() {
        let db = setup_db().await;
        let mut conn = get_connection(&db.pool).unwrap();
        seed_basic_content(&mut conn, "u1", "p1", 3);
        insert_user(&mut conn, "u2", true);
        insert_user(&mut conn, "u3", true);
        let repo = DuelRepository::new(db.pool.clone(), db.writer.clone());
        let svc = duel_service(&db);

        let missing = svc.submit_answer("ghost", "u1", "q1", vec![], 100).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let duel = repo.create(new_duel("u1", Some("u2"), &["q1", "q2"])).await.unwrap();
        // the fixed opponent may not play before accepting
        let early = svc
            .submit_answer(&duel.id, "u2", "q1", vec!["q1-a".to_string()], 100)
            .await;
        assert!(matches!(early, Err(Error::Conflict(_))));

        svc.accept(&duel.id, "u2").await.unwrap();
        let outsider = svc
            .submit_answer(&duel.id, "u3", "q1", vec!["q1-a".to_string()], 100)
            .await;
        assert!(matches!(outsider, Err(Error::Forbidden(_))));

        let off_list = svc
            .submit_answer(&duel.id, "u1", "q3", vec!["q3-a".to_string()], 100)
            .await;
        assert!(matches!(off_list, Err(Error::Validation(_))));

        let mut overdue = new_duel("u1", Some("u2"), &["q1"]);
        overdue.expires_at = Utc::now() - Duration::hours(1);
        let expired = repo.create(overdue).await.unwrap();
        repo.accept(&expired.id, "u2").await.unwrap();
        repo.expire_due(Utc::now()).await.unwrap();
        let too_late = svc
            .submit_answer(&expired.id, "u1", "q1", vec!["q1-a".to_string()], 100)
            .await;
        assert!(matches!(too_late, Err(Error::Conflict(_))));
    }
}
