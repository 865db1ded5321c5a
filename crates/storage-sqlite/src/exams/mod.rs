//! Exam session persistence and grading bookkeeping.

mod model;
mod repository;

pub use repository::ExamRepository;
