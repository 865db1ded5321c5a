//! Diesel/SQLite persistence for the QuizKit progression engine.
//!
//! Reads go through an r2d2 pool; every mutation is executed by the
//! single-writer actor in `db::write_actor`, one immediate transaction per
//! job.

pub mod db;
pub mod errors;
pub mod schema;

pub mod activity;
pub mod badges;
pub mod content;
pub mod duels;
pub mod exams;
pub mod gamification;
pub mod leaderboard;
pub mod leitner;
pub mod speedrun;
pub mod training;

pub(crate) mod util;

#[cfg(test)]
pub(crate) mod testing;
