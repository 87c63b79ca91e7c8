//! Seams to the external collaborators: camera and pose detection engine.
//!
//! Both are asynchronous in nature. The engine answers each submitted frame
//! through a one-shot channel; the session awaits that answer before
//! submitting the next frame, so at most one request is in flight.

use crate::keypoints::KeypointSet;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// A captured camera frame.
///
/// Pixel data stays with the camera adapter; the session only needs to
/// route the frame to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
}

/// Camera could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraError(pub String);

impl std::fmt::Display for CameraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Camera error: {}", self.0)
    }
}

impl std::error::Error for CameraError {}

/// A video source.
pub trait Camera: Send {
    /// Open the device. Called once per `Idle -> CameraActive` attempt.
    fn acquire(&mut self) -> Result<(), CameraError>;

    /// Next frame, or `None` when the stream has ended.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Stop all tracks. Must be complete when it returns.
    fn release(&mut self);
}

/// The engine failed on a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionError(pub String);

impl std::fmt::Display for DetectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Detection error: {}", self.0)
    }
}

impl std::error::Error for DetectionError {}

/// Engine answer for one frame; `Ok(None)` means no person was found.
pub type Detection = Result<Option<KeypointSet>, DetectionError>;

/// A pose detection engine.
pub trait DetectionEngine: Send {
    /// Start detection on a frame. The receiver resolves once with the result.
    fn submit(&mut self, frame: Frame) -> oneshot::Receiver<Detection>;
}

/// Resolves exactly once, when the engine has finished loading.
pub type EngineReady = oneshot::Receiver<Result<Box<dyn DetectionEngine>, String>>;

/// Readiness signal for an engine that is already loaded.
pub fn ready<E: DetectionEngine + 'static>(engine: E) -> EngineReady {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Ok(Box::new(engine) as Box<dyn DetectionEngine>));
    rx
}

/// Readiness signal for an engine that failed to load.
pub fn failed(reason: impl Into<String>) -> EngineReady {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Err(reason.into()));
    rx
}
