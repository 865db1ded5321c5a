//! Leitner set/item persistence.

mod model;
mod repository;

pub use repository::LeitnerRepository;
