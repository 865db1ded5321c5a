//! Domain logic of the QuizKit progression and competition engine.
//!
//! This crate holds the pure rules (XP, levels, streaks, badges, Leitner
//! scheduling, duel resolution), the repository traits the storage crate
//! implements, and the services that orchestrate multi-repository flows.

pub mod activity;
pub mod audit;
pub mod badges;
pub mod content;
pub mod duels;
pub mod errors;
pub mod exams;
pub mod gamification;
pub mod leaderboard;
pub mod leitner;
pub mod speedrun;
pub mod streaks;
pub mod time;
pub mod training;

pub use errors::{Error, Result};
