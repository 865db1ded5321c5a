//! XP account persistence.

mod model;
mod repository;

pub use repository::{award_xp, GamificationRepository};
pub(crate) use repository::load_snapshot;
