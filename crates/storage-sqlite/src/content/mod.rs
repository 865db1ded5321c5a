//! Read-only queries over pools, questions, and answers.

mod repository;

pub use repository::ContentRepository;
