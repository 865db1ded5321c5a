use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::audit::AuditSink;
use crate::content::ContentRepositoryTrait;
use crate::duels::MAX_ANSWER_TIME_MS;
use crate::errors::{Error, Result};

use super::{
    xp_for_duration, SpeedrunFinish, SpeedrunRepositoryTrait, SpeedrunSession, SpeedrunStats,
};

pub struct SpeedrunService {
    speedruns: Arc<dyn SpeedrunRepositoryTrait>,
    content: Arc<dyn ContentRepositoryTrait>,
    audit: Arc<dyn AuditSink>,
}

impl SpeedrunService {
    pub fn new(
        speedruns: Arc<dyn SpeedrunRepositoryTrait>,
        content: Arc<dyn ContentRepositoryTrait>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            speedruns,
            content,
            audit,
        }
    }

    pub async fn start(
        &self,
        user_id: &str,
        pool_id: &str,
        duration_minutes: i32,
    ) -> Result<SpeedrunSession> {
        // Validates the duration before touching storage.
        xp_for_duration(duration_minutes)?;
        if !self.content.pool_exists(pool_id)? {
            return Err(Error::not_found(format!("pool {pool_id}")));
        }
        let session = self
            .speedruns
            .create_session(user_id, pool_id, duration_minutes)
            .await?;
        self.audit.record(
            "speedrun_start",
            Some(user_id),
            json!({ "session": session.id, "duration_min": duration_minutes }),
        );
        Ok(session)
    }

    pub async fn record_answer(
        &self,
        session_id: &str,
        user_id: &str,
        question_id: &str,
        correct: bool,
        time_ms: i64,
    ) -> Result<bool> {
        let session = self.owned_session(session_id, user_id)?;
        if session.is_finished() {
            return Err(Error::conflict("speedrun already finished"));
        }
        if self.content.question_pool(question_id)?.as_deref() != Some(session.pool_id.as_str()) {
            return Err(Error::validation("question is not part of this run's pool"));
        }
        self.speedruns
            .record_answer(
                session_id,
                question_id,
                correct,
                time_ms.clamp(0, MAX_ANSWER_TIME_MS),
            )
            .await
    }

    pub async fn finish(&self, session_id: &str, user_id: &str) -> Result<SpeedrunFinish> {
        let session = self.owned_session(session_id, user_id)?;
        if session.is_finished() {
            return Err(Error::conflict("speedrun already finished"));
        }
        let xp = xp_for_duration(session.duration_minutes)?;
        let finish = self.speedruns.finish(session_id, Utc::now(), xp).await?;
        self.audit.record(
            "speedrun_finish",
            Some(user_id),
            json!({
                "session": session_id,
                "correct": finish.correct_count,
                "total": finish.total_answered,
            }),
        );
        Ok(finish)
    }

    pub fn stats(&self, user_id: &str) -> Result<SpeedrunStats> {
        self.speedruns.stats(user_id)
    }

    fn owned_session(&self, session_id: &str, user_id: &str) -> Result<SpeedrunSession> {
        let session = self
            .speedruns
            .load_session(session_id)?
            .ok_or_else(|| Error::not_found(format!("speedrun session {session_id}")))?;
        if session.user_id != user_id {
            return Err(Error::forbidden("session belongs to another user"));
        }
        Ok(session)
    }
}
