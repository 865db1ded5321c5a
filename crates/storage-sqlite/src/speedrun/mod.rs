//! Speedrun session persistence.

mod model;
mod repository;

pub use repository::SpeedrunRepository;
