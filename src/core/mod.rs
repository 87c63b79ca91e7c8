//! Core posture analysis.
//!
//! This module contains:
//! - Metric extraction from pose keypoints
//! - Rule-based posture classification
//! - Alert debouncing over sustained poor posture
//! - An injectable clock so timing can be driven from tests and replays

pub mod classifier;
pub mod clock;
pub mod debounce;
pub mod metrics;

// Re-export commonly used types
pub use classifier::{classify, PostureClassification, PostureIssue, Remedy, GOOD_POSTURE_MESSAGE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{AlertDebouncer, DebounceOutcome, DebounceState, PostureEdge};
pub use metrics::{extract_metrics, MissingKeypointError, PostureMetrics};
