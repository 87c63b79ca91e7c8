//! Posture Watch - real-time posture monitoring from pose keypoints.
//!
//! Each camera frame is turned into body keypoints by a pose detection
//! engine. The keypoints are reduced to a handful of posture metrics,
//! classified against configurable thresholds, and debounced so that the
//! user is only warned after poor posture has been held for a while.
//! Short synthesized tones mark changes in posture.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Posture Watch                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Camera    │──▶│  Detection  │──▶│   Metrics   │       │
//! │  │  (frames)   │   │  (engine)   │   │  (extract)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Audio     │◀──│  Debounce   │◀──│  Classifier │       │
//! │  │  Feedback   │   │  (dwell)    │   │   (rules)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                                 │
//! │                           ▼                                 │
//! │                    ┌─────────────┐                          │
//! │                    │   Alerts    │                          │
//! │                    └─────────────┘                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use posture_watch::core::{classify, extract_metrics};
//! use posture_watch::keypoints::Recording;
//! use posture_watch::Config;
//!
//! let config = Config::default();
//! let recording = Recording::load("demos/slouch.jsonl".as_ref()).expect("recording");
//!
//! for frame in recording.frames() {
//!     if let Some(keypoints) = &frame.keypoints {
//!         if let Ok(metrics) = extract_metrics(keypoints, &config.thresholds) {
//!             println!("{}", classify(&metrics, &config.thresholds).summary());
//!         }
//!     }
//! }
//! ```

pub mod audio;
pub mod config;
pub mod core;
pub mod keypoints;
pub mod session;
pub mod stats;

// Re-export key types at crate root for convenience
pub use audio::{AudioFeedback, AudioUnavailableError, CueKind, ToneSink};
pub use config::{Config, ConfigError, Thresholds};
pub use core::{Clock, ManualClock, PostureClassification, PostureIssue, PostureMetrics, SystemClock};
pub use keypoints::{Keypoint, KeypointSet, Landmark, Recording};
pub use session::observer::{NullObserver, PostureObserver};
pub use session::{SessionController, SessionError, SessionState, StopHandle};
pub use stats::{SessionStats, SharedSessionStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
