//! Two-player asynchronous quiz duels.
//!
//! Lifecycle: `waiting -> active -> {finished, expired}`. The question list
//! is frozen at creation; answers are unique per (duel, user, question);
//! resolution runs exactly once when both participants have completed.

mod models;
mod resolution;
mod service;
mod status;
pub mod sweeper;

pub use models::{
    AnswerOutcome, AnswerSubmission, CreateDuelRequest, Duel, DuelAnswer, DuelDetail,
    DuelListEntry, DuelResult, DuelStats, NewDuel, OpenDuelEntry, ParticipantScore,
};
pub use resolution::{resolve, winner_flags, xp_for, DuelOutcome};
pub use service::DuelService;
pub use status::DuelStatus;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;

/// Allowed range for the number of questions in a duel.
pub const MIN_QUESTION_COUNT: i32 = 3;
pub const MAX_QUESTION_COUNT: i32 = 10;
pub const DEFAULT_QUESTION_COUNT: i32 = 5;

/// Cap on concurrently waiting/active duels created by one user.
pub const MAX_OPEN_DUELS_PER_USER: i64 = 10;

/// Duels expire this long after creation.
pub const DUEL_TTL_HOURS: i64 = 48;

/// Upper clamp for a single answer's response time.
pub const MAX_ANSWER_TIME_MS: i64 = 600_000;

#[async_trait]
pub trait DuelRepositoryTrait: Send + Sync {
    fn load(&self, duel_id: &str) -> Result<Option<Duel>>;

    /// Inserts the duel. The per-challenger cap on waiting/active duels is
    /// checked inside the insert transaction; exceeding it is a `Conflict`.
    async fn create(&self, new_duel: NewDuel) -> Result<Duel>;

    /// Conditional accept: sets the opponent and activates the duel only if
    /// it is still `waiting`, the acceptor is not the challenger, and no
    /// other opponent is fixed. Returns false when the condition did not
    /// match (the caller re-reads to produce a precise rejection).
    async fn accept(&self, duel_id: &str, user_id: &str) -> Result<bool>;

    /// Records an answer, materializes the participant's result when all
    /// questions are answered, and resolves the duel when both results
    /// exist, all in one transaction. A repeated (duel, user, question)
    /// triple is a `Conflict`.
    async fn submit_answer(&self, submission: AnswerSubmission) -> Result<AnswerOutcome>;

    fn list_for(&self, user_id: &str, status: Option<DuelStatus>) -> Result<Vec<DuelListEntry>>;

    /// Open waiting duels from other users.
    fn list_open(&self, user_id: &str) -> Result<Vec<OpenDuelEntry>>;

    /// Full duel view for one participant. Opponent answers are withheld
    /// until the duel is finished.
    fn detail(&self, duel_id: &str, viewer_id: &str) -> Result<Option<DuelDetail>>;

    async fn delete(&self, duel_id: &str) -> Result<()>;

    /// Deletes this user's non-active duels (plus finished/expired duels
    /// where the user was the opponent). Returns the number deleted.
    async fn reset_for(&self, user_id: &str) -> Result<usize>;

    fn stats_for(&self, user_id: &str) -> Result<DuelStats>;

    /// Transitions overdue waiting/active duels to `expired` and awards the
    /// flat expiry XP to both known participants, once per duel. Idempotent.
    async fn expire_due(&self, now: DateTime<Utc>) -> Result<usize>;
}
