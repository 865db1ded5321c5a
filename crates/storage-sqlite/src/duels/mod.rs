//! Duel persistence: lifecycle, answers, results, and the expiry sweep.

mod model;
mod repository;

pub use repository::DuelRepository;
