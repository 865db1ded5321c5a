use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use crate::audit::AuditSink;
use crate::content::ContentRepositoryTrait;
use crate::errors::{Error, Result};

use super::{
    AnswerOutcome, AnswerSubmission, CreateDuelRequest, Duel, DuelDetail, DuelListEntry,
    DuelRepositoryTrait, DuelStats, DuelStatus, NewDuel, OpenDuelEntry, DEFAULT_QUESTION_COUNT,
    DUEL_TTL_HOURS, MAX_ANSWER_TIME_MS, MAX_QUESTION_COUNT, MIN_QUESTION_COUNT,
};

pub struct DuelService {
    duels: Arc<dyn DuelRepositoryTrait>,
    content: Arc<dyn ContentRepositoryTrait>,
    audit: Arc<dyn AuditSink>,
}

impl DuelService {
    pub fn new(
        duels: Arc<dyn DuelRepositoryTrait>,
        content: Arc<dyn ContentRepositoryTrait>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            duels,
            content,
            audit,
        }
    }

    pub async fn create(&self, request: CreateDuelRequest) -> Result<Duel> {
        if let Some(opponent) = request.opponent_id.as_deref() {
            if opponent == request.challenger_id {
                return Err(Error::validation("cannot duel yourself"));
            }
        }
        if !self.content.pool_exists(&request.pool_id)? {
            return Err(Error::not_found(format!(
                "pool {} does not exist",
                request.pool_id
            )));
        }

        let question_count = request
            .question_count
            .unwrap_or(DEFAULT_QUESTION_COUNT)
            .clamp(MIN_QUESTION_COUNT, MAX_QUESTION_COUNT);
        let question_ids = self
            .content
            .sample_question_ids(&request.pool_id, question_count as usize)?;
        if question_ids.len() < question_count as usize {
            return Err(Error::validation(format!(
                "not enough questions in pool ({} available, {} needed)",
                question_ids.len(),
                question_count
            )));
        }

        let duel = self
            .duels
            .create(NewDuel {
                challenger_id: request.challenger_id.clone(),
                opponent_id: request.opponent_id,
                pool_id: request.pool_id.clone(),
                question_count,
                question_ids,
                is_open: request.is_open,
                expires_at: Utc::now() + Duration::hours(DUEL_TTL_HOURS),
            })
            .await?;

        self.audit.record(
            "duel_create",
            Some(&request.challenger_id),
            json!({ "duel": duel.id, "pool": request.pool_id }),
        );
        Ok(duel)
    }

    /// Accepts a waiting duel. Under a race, exactly one acceptor succeeds;
    /// the loser gets a deterministic rejection derived from fresh state.
    pub async fn accept(&self, duel_id: &str, user_id: &str) -> Result<()> {
        if self.duels.accept(duel_id, user_id).await? {
            self.audit
                .record("duel_accept", Some(user_id), json!({ "duel": duel_id }));
            return Ok(());
        }

        let duel = self
            .duels
            .load(duel_id)?
            .ok_or_else(|| Error::not_found(format!("duel {duel_id}")))?;
        if duel.challenger_id == user_id {
            return Err(Error::validation("cannot accept your own duel"));
        }
        if !duel.status.can_accept() {
            return Err(Error::conflict(format!("duel is {}", duel.status)));
        }
        Err(Error::forbidden("duel is reserved for another opponent"))
    }

    pub async fn submit_answer(
        &self,
        duel_id: &str,
        user_id: &str,
        question_id: &str,
        selected_answer_ids: Vec<String>,
        time_ms: i64,
    ) -> Result<AnswerOutcome> {
        let duel = self
            .duels
            .load(duel_id)?
            .ok_or_else(|| Error::not_found(format!("duel {duel_id}")))?;
        if !duel.status.accepts_answers() {
            return Err(Error::conflict(format!("duel is {}", duel.status)));
        }
        if !duel.is_participant(user_id) {
            return Err(Error::forbidden("not a participant of this duel"));
        }
        // A fixed opponent may not play ahead of accepting.
        if duel.status == DuelStatus::Waiting && duel.opponent_id.as_deref() == Some(user_id) {
            return Err(Error::conflict("duel not active yet"));
        }
        if !duel.includes_question(question_id) {
            return Err(Error::validation("question is not part of this duel"));
        }

        let outcome = self
            .duels
            .submit_answer(AnswerSubmission {
                duel_id: duel_id.to_string(),
                user_id: user_id.to_string(),
                question_id: question_id.to_string(),
                selected_answer_ids,
                time_ms: time_ms.clamp(0, MAX_ANSWER_TIME_MS),
            })
            .await?;

        if outcome.finished {
            self.audit
                .record("duel_finish", Some(user_id), json!({ "duel": duel_id }));
        }
        Ok(outcome)
    }

    pub fn get(&self, duel_id: &str, viewer_id: &str) -> Result<DuelDetail> {
        let detail = self
            .duels
            .detail(duel_id, viewer_id)?
            .ok_or_else(|| Error::not_found(format!("duel {duel_id}")))?;
        if !detail.duel.is_participant(viewer_id) {
            return Err(Error::forbidden("not a participant of this duel"));
        }
        Ok(detail)
    }

    pub fn list(&self, user_id: &str, status: Option<DuelStatus>) -> Result<Vec<DuelListEntry>> {
        self.duels.list_for(user_id, status)
    }

    pub fn list_open(&self, user_id: &str) -> Result<Vec<OpenDuelEntry>> {
        self.duels.list_open(user_id)
    }

    pub async fn delete(&self, duel_id: &str, user_id: &str) -> Result<()> {
        let duel = self
            .duels
            .load(duel_id)?
            .ok_or_else(|| Error::not_found(format!("duel {duel_id}")))?;
        if !duel.is_participant(user_id) {
            return Err(Error::forbidden("not a participant of this duel"));
        }
        if !duel.status.can_delete() {
            return Err(Error::conflict("cannot delete an active duel"));
        }
        self.duels.delete(duel_id).await?;
        self.audit
            .record("duel_delete", Some(user_id), json!({ "duel": duel_id }));
        Ok(())
    }

    pub async fn reset(&self, user_id: &str) -> Result<usize> {
        let deleted = self.duels.reset_for(user_id).await?;
        self.audit
            .record("duel_reset", Some(user_id), json!({ "count": deleted }));
        Ok(deleted)
    }

    pub fn stats(&self, user_id: &str) -> Result<DuelStats> {
        self.duels.stats_for(user_id)
    }

    /// One expiry sweep pass. Safe to run concurrently with answer intake
    /// and from multiple processes; the conditional update in the repository
    /// makes it idempotent.
    pub async fn expire_due(&self) -> Result<usize> {
        let expired = self.duels.expire_due(Utc::now()).await?;
        if expired > 0 {
            self.audit
                .record("duel_expire", None, json!({ "count": expired }));
        }
        Ok(expired)
    }
}
