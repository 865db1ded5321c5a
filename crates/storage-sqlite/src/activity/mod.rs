//! Daily activity ledger persistence.

mod model;
mod repository;

pub use repository::{merge_daily_activity, ActivityRepository};
