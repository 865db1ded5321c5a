use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::activity::ActivityDelta;
use crate::audit::AuditSink;
use crate::content::ContentRepositoryTrait;
use crate::errors::{Error, Result};
use crate::gamification::XpRules;
use crate::time::{local_date, TimezoneCache};

use super::{
    validate_box_filter, LeitnerAnswerOutcome, LeitnerAnswerRecord, LeitnerItem, LeitnerMode,
    LeitnerProgress, LeitnerRepositoryTrait, LeitnerSet, LeitnerStats, MilestoneCheck,
    NewLeitnerSet, MILESTONES,
};

pub struct LeitnerService {
    leitner: Arc<dyn LeitnerRepositoryTrait>,
    content: Arc<dyn ContentRepositoryTrait>,
    timezones: Arc<TimezoneCache>,
    audit: Arc<dyn AuditSink>,
    rules: XpRules,
}

impl LeitnerService {
    pub fn new(
        leitner: Arc<dyn LeitnerRepositoryTrait>,
        content: Arc<dyn ContentRepositoryTrait>,
        timezones: Arc<TimezoneCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            leitner,
            content,
            timezones,
            audit,
            rules: XpRules::standard(),
        }
    }

    pub async fn create_set(
        &self,
        user_id: &str,
        pool_id: &str,
        name: &str,
        mode: LeitnerMode,
    ) -> Result<LeitnerSet> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("set name must not be empty"));
        }
        if !self.content.pool_exists(pool_id)? {
            return Err(Error::not_found(format!("pool {pool_id}")));
        }
        let set = self
            .leitner
            .create_set(NewLeitnerSet {
                user_id: user_id.to_string(),
                pool_id: pool_id.to_string(),
                name: name.to_string(),
                mode,
            })
            .await?;
        self.audit.record(
            "leitner_set_create",
            Some(user_id),
            json!({ "set": set.id, "pool": pool_id }),
        );
        Ok(set)
    }

    pub fn list_sets(&self, user_id: &str) -> Result<Vec<LeitnerSet>> {
        self.leitner.list_sets(user_id)
    }

    pub async fn delete_set(&self, set_id: &str, user_id: &str) -> Result<()> {
        self.owned_set(set_id, user_id)?;
        self.leitner.delete_set(set_id).await?;
        self.audit
            .record("leitner_set_delete", Some(user_id), json!({ "set": set_id }));
        Ok(())
    }

    /// Fills the set with box-1 items for every pool question not yet
    /// present. Idempotent.
    pub async fn seed(&self, set_id: &str, user_id: &str) -> Result<usize> {
        let set = self.owned_set(set_id, user_id)?;
        let question_ids = self.content.pool_question_ids(&set.pool_id)?;
        let inserted = self.leitner.seed(set_id, user_id, question_ids).await?;
        self.audit.record(
            "leitner_seed",
            Some(user_id),
            json!({ "set": set_id, "inserted": inserted }),
        );
        Ok(inserted)
    }

    pub async fn answer(
        &self,
        set_id: &str,
        user_id: &str,
        timezone: Option<&str>,
        question_id: &str,
        correct: bool,
    ) -> Result<LeitnerAnswerOutcome> {
        let set = self.owned_set(set_id, user_id)?;
        if self.content.question_pool(question_id)?.as_deref() != Some(set.pool_id.as_str()) {
            return Err(Error::validation("question is not part of this set's pool"));
        }

        let tz = self.timezones.resolve(timezone);
        let xp = if correct { self.rules.leitner_correct } else { 0.0 };
        self.leitner
            .answer(LeitnerAnswerRecord {
                set_id: set_id.to_string(),
                user_id: user_id.to_string(),
                pool_id: set.pool_id.clone(),
                question_id: question_id.to_string(),
                correct,
                mode: set.mode,
                local_date: local_date(Utc::now(), tz),
                xp,
                delta: ActivityDelta::leitner(correct),
            })
            .await
    }

    pub fn due_items(
        &self,
        set_id: &str,
        user_id: &str,
        boxes: Option<Vec<i32>>,
    ) -> Result<Vec<LeitnerItem>> {
        self.owned_set(set_id, user_id)?;
        validate_box_filter(&boxes)?;
        self.leitner.due_items(set_id, boxes, Utc::now())
    }

    pub fn all_items(
        &self,
        set_id: &str,
        user_id: &str,
        boxes: Option<Vec<i32>>,
    ) -> Result<Vec<LeitnerItem>> {
        self.owned_set(set_id, user_id)?;
        validate_box_filter(&boxes)?;
        self.leitner.all_items(set_id, boxes)
    }

    pub fn stats(&self, set_id: &str, user_id: &str) -> Result<LeitnerStats> {
        self.owned_set(set_id, user_id)?;
        self.leitner.stats(set_id)
    }

    pub fn progress(&self, set_id: &str, user_id: &str) -> Result<LeitnerProgress> {
        let set = self.owned_set(set_id, user_id)?;
        let stats = self.leitner.stats(set_id)?;
        let milestones = self.leitner.recorded_milestones(set_id)?;
        Ok(LeitnerProgress {
            boxes: stats.boxes,
            total: stats.total,
            mastered: stats.boxes[4],
            mastery_percent: stats.mastery_percent(),
            milestones,
            session_stats: set.session_stats,
        })
    }

    /// Records every milestone the current mastery has crossed but not yet
    /// recorded. Milestones already on file are reported, not re-recorded.
    pub async fn check_milestone(&self, set_id: &str, user_id: &str) -> Result<MilestoneCheck> {
        self.owned_set(set_id, user_id)?;
        let stats = self.leitner.stats(set_id)?;
        let mastery = stats.mastery_percent();

        let mut newly_recorded = Vec::new();
        let mut already_recorded = Vec::new();
        for milestone in MILESTONES {
            if mastery < milestone as f64 {
                continue;
            }
            if self.leitner.record_milestone(set_id, user_id, milestone).await? {
                newly_recorded.push(milestone);
            } else {
                already_recorded.push(milestone);
            }
        }

        if !newly_recorded.is_empty() {
            self.audit.record(
                "leitner_milestone",
                Some(user_id),
                json!({ "set": set_id, "milestones": newly_recorded }),
            );
        }
        Ok(MilestoneCheck {
            mastery_percent: mastery,
            newly_recorded,
            already_recorded,
        })
    }

    pub async fn reset(&self, set_id: &str, user_id: &str) -> Result<usize> {
        self.owned_set(set_id, user_id)?;
        let removed = self.leitner.reset_items(set_id).await?;
        self.audit.record(
            "leitner_reset",
            Some(user_id),
            json!({ "set": set_id, "removed": removed }),
        );
        Ok(removed)
    }

    fn owned_set(&self, set_id: &str, user_id: &str) -> Result<LeitnerSet> {
        let set = self
            .leitner
            .load_set(set_id)?
            .ok_or_else(|| Error::not_found(format!("set {set_id}")))?;
        if set.user_id != user_id {
            return Err(Error::forbidden("set belongs to another user"));
        }
        Ok(set)
    }
}
