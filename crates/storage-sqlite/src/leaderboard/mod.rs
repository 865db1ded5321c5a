//! Leaderboard computation and snapshot persistence.

mod repository;

pub use repository::LeaderboardRepository;
