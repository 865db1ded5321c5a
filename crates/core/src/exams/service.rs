use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::activity::ActivityDelta;
use crate::audit::AuditSink;
use crate::content::{exact_set_match, ContentRepositoryTrait};
use crate::errors::{Error, Result};
use crate::gamification::XpRules;
use crate::time::{local_date, TimezoneCache};

use super::{
    ExamAnswerInput, ExamOutcome, ExamRepositoryTrait, ExamSession, ExamSubmission,
    GradedExamAnswer, NewExamSession, PASS_ACCURACY,
};

pub struct ExamService {
    exams: Arc<dyn ExamRepositoryTrait>,
    content: Arc<dyn ContentRepositoryTrait>,
    timezones: Arc<TimezoneCache>,
    audit: Arc<dyn AuditSink>,
    rules: XpRules,
}

impl ExamService {
    pub fn new(
        exams: Arc<dyn ExamRepositoryTrait>,
        content: Arc<dyn ContentRepositoryTrait>,
        timezones: Arc<TimezoneCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            exams,
            content,
            timezones,
            audit,
            rules: XpRules::standard(),
        }
    }

    pub async fn start(&self, user_id: &str, pool_id: &str, count: i32) -> Result<ExamSession> {
        if count <= 0 {
            return Err(Error::validation("question count must be positive"));
        }
        if !self.content.pool_exists(pool_id)? {
            return Err(Error::not_found(format!("pool {pool_id}")));
        }
        let question_ids = self.content.sample_question_ids(pool_id, count as usize)?;
        if question_ids.len() < count as usize {
            return Err(Error::validation(format!(
                "not enough questions in pool ({} available, {count} needed)",
                question_ids.len()
            )));
        }

        let session = self
            .exams
            .create_session(NewExamSession {
                user_id: user_id.to_string(),
                pool_id: pool_id.to_string(),
                question_ids,
            })
            .await?;
        self.audit.record(
            "exam_start",
            Some(user_id),
            json!({ "session": session.id, "pool": pool_id }),
        );
        Ok(session)
    }

    pub async fn submit(
        &self,
        session_id: &str,
        user_id: &str,
        timezone: Option<&str>,
        answers: Vec<ExamAnswerInput>,
    ) -> Result<ExamOutcome> {
        let session = self
            .exams
            .load_session(session_id)?
            .ok_or_else(|| Error::not_found(format!("exam session {session_id}")))?;
        if session.user_id != user_id {
            return Err(Error::forbidden("session belongs to another user"));
        }
        if session.is_finished() {
            return Err(Error::conflict("exam already submitted"));
        }
        if answers.len() != session.question_ids.len() {
            return Err(Error::validation(format!(
                "expected {} answers, got {}",
                session.question_ids.len(),
                answers.len()
            )));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut graded = Vec::with_capacity(answers.len());
        for answer in &answers {
            if !session.question_ids.iter().any(|q| q == &answer.question_id) {
                return Err(Error::validation(format!(
                    "question {} is not part of this exam",
                    answer.question_id
                )));
            }
            if !seen.insert(answer.question_id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate answer for question {}",
                    answer.question_id
                )));
            }
            let correct_set = self
                .content
                .correct_answer_ids(&answer.question_id)?
                .ok_or_else(|| Error::not_found(format!("question {}", answer.question_id)))?;
            graded.push(GradedExamAnswer {
                question_id: answer.question_id.clone(),
                selected_answer_ids: answer.selected_answer_ids.clone(),
                correct: exact_set_match(&answer.selected_answer_ids, &correct_set),
            });
        }

        let total = graded.len() as i32;
        let correct = graded.iter().filter(|a| a.correct).count() as i32;
        let accuracy = correct as f64 / total as f64;
        let mut xp = correct as f64 * self.rules.exam_correct;
        if accuracy >= PASS_ACCURACY {
            xp += self.rules.exam_bonus;
        }

        let tz = self.timezones.resolve(timezone);
        let snapshot = self
            .exams
            .submit(ExamSubmission {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                pool_id: session.pool_id.clone(),
                answers: graded,
                correct_count: correct,
                local_date: local_date(Utc::now(), tz),
                xp,
                delta: ActivityDelta::exam(correct, total),
            })
            .await?;

        self.audit.record(
            "exam_submit",
            Some(user_id),
            json!({ "session": session_id, "correct": correct, "total": total }),
        );
        Ok(ExamOutcome {
            correct,
            total,
            accuracy,
            passed: accuracy >= PASS_ACCURACY,
            xp_awarded: xp,
            xp: snapshot.xp,
            level: snapshot.level,
        })
    }
}
