//! Monthly donation tracking: counting confirmed calls, blocking accounts
//! at the goal, and unblocking on month rollover.

pub mod engine;
pub mod reset_job;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{CallCount, ResetEffect, TrackerEngine};
pub use reset_job::{ResetJobOptions, ResetReport};
pub use store::{PgTrackerStore, PgUserDirectory, TrackerStore, UserDirectory};
