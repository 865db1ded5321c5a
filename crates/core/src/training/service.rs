use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::activity::ActivityDelta;
use crate::audit::AuditSink;
use crate::content::{exact_set_match, ContentRepositoryTrait};
use crate::errors::{Error, Result};
use crate::gamification::XpRules;
use crate::time::{local_date, TimezoneCache};

use super::{TrainingAnswerOutcome, TrainingRepositoryTrait, TrainingScore};

pub struct TrainingService {
    training: Arc<dyn TrainingRepositoryTrait>,
    content: Arc<dyn ContentRepositoryTrait>,
    timezones: Arc<TimezoneCache>,
    audit: Arc<dyn AuditSink>,
    rules: XpRules,
}

impl TrainingService {
    pub fn new(
        training: Arc<dyn TrainingRepositoryTrait>,
        content: Arc<dyn ContentRepositoryTrait>,
        timezones: Arc<TimezoneCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            training,
            content,
            timezones,
            audit,
            rules: XpRules::standard(),
        }
    }

    pub async fn record_training_answer(
        &self,
        user_id: &str,
        timezone: Option<&str>,
        question_id: &str,
        selected_answer_ids: Vec<String>,
    ) -> Result<TrainingAnswerOutcome> {
        let pool_id = self
            .content
            .question_pool(question_id)?
            .ok_or_else(|| Error::not_found(format!("question {question_id}")))?;
        let correct_set = self
            .content
            .correct_answer_ids(question_id)?
            .ok_or_else(|| Error::not_found(format!("question {question_id}")))?;

        let correct = exact_set_match(&selected_answer_ids, &correct_set);
        let xp = if correct {
            self.rules.training_correct
        } else {
            self.rules.training_wrong
        };
        self.apply(user_id, timezone, &pool_id, question_id, correct, xp)
            .await
    }

    /// Single-choice variant. The question must have exactly one correct
    /// answer; the swipe is correct iff it selects that answer.
    pub async fn record_swipe_answer(
        &self,
        user_id: &str,
        timezone: Option<&str>,
        question_id: &str,
        selected_answer_id: &str,
    ) -> Result<TrainingAnswerOutcome> {
        let pool_id = self
            .content
            .question_pool(question_id)?
            .ok_or_else(|| Error::not_found(format!("question {question_id}")))?;
        let correct_set = self
            .content
            .correct_answer_ids(question_id)?
            .ok_or_else(|| Error::not_found(format!("question {question_id}")))?;
        if correct_set.is_empty() {
            return Err(Error::validation("question has no correct answer"));
        }

        let correct = correct_set.contains(selected_answer_id);
        let xp = if correct { self.rules.swipe_correct } else { 0.0 };
        self.apply(user_id, timezone, &pool_id, question_id, correct, xp)
            .await
    }

    async fn apply(
        &self,
        user_id: &str,
        timezone: Option<&str>,
        pool_id: &str,
        question_id: &str,
        correct: bool,
        xp: f64,
    ) -> Result<TrainingAnswerOutcome> {
        let tz = self.timezones.resolve(timezone);
        let snapshot = self
            .training
            .record(TrainingScore {
                user_id: user_id.to_string(),
                pool_id: pool_id.to_string(),
                question_id: question_id.to_string(),
                local_date: local_date(Utc::now(), tz),
                correct,
                xp,
                delta: ActivityDelta::training(correct),
            })
            .await?;

        self.audit.record(
            "training_answer",
            Some(user_id),
            json!({ "question": question_id, "correct": correct }),
        );
        Ok(TrainingAnswerOutcome {
            correct,
            xp_awarded: xp,
            xp: snapshot.xp,
            level: snapshot.level,
        })
    }
}
