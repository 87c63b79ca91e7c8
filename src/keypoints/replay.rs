//! Replay of recorded keypoint streams.
//!
//! A recording is a JSON Lines file, one frame per line:
//!
//! ```text
//! {"t_ms": 0, "keypoints": [{"x": 0.5, "y": 0.3}, ...]}
//! {"t_ms": 100, "keypoints": null}
//! ```
//!
//! `t_ms` is the capture time relative to the start of the recording and
//! must not decrease. `keypoints: null` is a frame where no person was found.
//!
//! Replay splits a recording into a [`ReplayCamera`] and a [`ReplayEngine`]
//! that stand in for the real device and pose model. The engine moves a
//! [`ManualClock`] to each frame's capture time so dwell and cooldown
//! behave as they did when the stream was recorded.

use crate::core::clock::{span_ms, ManualClock, MAX_SPAN_MS};
use crate::keypoints::types::KeypointSet;
use crate::session::engine::{Camera, CameraError, Detection, DetectionEngine, DetectionError, Frame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One line of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub t_ms: u64,
    #[serde(default)]
    pub keypoints: Option<KeypointSet>,
}

/// A recorded keypoint stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self { frames }
    }

    /// Load a recording from a JSON Lines file.
    pub fn load(path: &Path) -> Result<Self, RecordingError> {
        let file = std::fs::File::open(path).map_err(|e| RecordingError::Io(e.to_string()))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse a recording from any line-oriented reader. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, RecordingError> {
        let mut frames: Vec<RecordedFrame> = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| RecordingError::Io(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: RecordedFrame =
                serde_json::from_str(&line).map_err(|e| RecordingError::Parse {
                    line: i + 1,
                    message: e.to_string(),
                })?;

            if frame.t_ms > MAX_SPAN_MS {
                return Err(RecordingError::Parse {
                    line: i + 1,
                    message: format!("t_ms {} is beyond the longest supported recording", frame.t_ms),
                });
            }
            if let Some(prev) = frames.last() {
                if frame.t_ms < prev.t_ms {
                    return Err(RecordingError::Parse {
                        line: i + 1,
                        message: format!("t_ms {} is earlier than {}", frame.t_ms, prev.t_ms),
                    });
                }
            }
            frames.push(frame);
        }

        if frames.is_empty() {
            return Err(RecordingError::Empty);
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Time span covered by the recording.
    pub fn duration_ms(&self) -> u64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.t_ms - first.t_ms,
            _ => 0,
        }
    }

    /// Split into a camera and engine that replay this recording from `start`.
    pub fn into_replay(
        self,
        start: DateTime<Utc>,
        clock: Arc<ManualClock>,
    ) -> (ReplayCamera, ReplayEngine) {
        let captured_at = self
            .frames
            .iter()
            .map(|f| start + span_ms(f.t_ms))
            .collect();
        let keypoints = self.frames.into_iter().map(|f| f.keypoints).collect();

        (
            ReplayCamera {
                captured_at,
                next: 0,
                acquired: false,
            },
            ReplayEngine { keypoints, clock },
        )
    }
}

/// Errors reading a recording.
#[derive(Debug)]
pub enum RecordingError {
    Io(String),
    Parse { line: usize, message: String },
    Empty,
}

impl std::fmt::Display for RecordingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingError::Io(e) => write!(f, "IO error: {e}"),
            RecordingError::Parse { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
            RecordingError::Empty => write!(f, "Recording contains no frames"),
        }
    }
}

impl std::error::Error for RecordingError {}

/// Emits one frame per recorded line.
pub struct ReplayCamera {
    captured_at: Vec<DateTime<Utc>>,
    next: usize,
    acquired: bool,
}

impl Camera for ReplayCamera {
    fn acquire(&mut self) -> Result<(), CameraError> {
        if self.captured_at.is_empty() {
            return Err(CameraError("recording has no frames".to_string()));
        }
        self.acquired = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if !self.acquired {
            return None;
        }
        let captured_at = *self.captured_at.get(self.next)?;
        let frame = Frame {
            sequence: self.next as u64,
            captured_at,
        };
        self.next += 1;
        Some(frame)
    }

    fn release(&mut self) {
        self.acquired = false;
    }
}

/// Answers each frame with its recorded keypoints.
pub struct ReplayEngine {
    keypoints: Vec<Option<KeypointSet>>,
    clock: Arc<ManualClock>,
}

impl DetectionEngine for ReplayEngine {
    fn submit(&mut self, frame: Frame) -> oneshot::Receiver<Detection> {
        let (tx, rx) = oneshot::channel();
        self.clock.set(frame.captured_at);

        let result = match self.keypoints.get(frame.sequence as usize) {
            Some(keypoints) => Ok(keypoints.clone()),
            None => Err(DetectionError(format!(
                "no recorded keypoints for frame {}",
                frame.sequence
            ))),
        };
        let _ = tx.send(result);
        rx
    }
}
