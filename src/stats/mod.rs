//! Session statistics.
//!
//! Counts what happened during the current monitoring session so the user
//! can see how much of the time their posture was judged good and how
//! often they were alerted.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_stats, SessionStats, SharedSessionStats, StatsSnapshot};
