//! Earned-badge persistence. The catalog itself is seeded by migration.

mod repository;

pub use repository::BadgeRepository;
