//! Keypoint input for posture analysis.
//!
//! The pose detection engine is external; this module defines the keypoint
//! data it hands over and a replay source for recorded streams.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{RecordedFrame, Recording, RecordingError, ReplayCamera, ReplayEngine};
pub use types::{Keypoint, KeypointSet, Landmark};
