//! Training/swipe scoring persistence and per-question stats.

mod repository;

pub use repository::TrainingRepository;

pub(crate) use repository::upsert_question_stats;
