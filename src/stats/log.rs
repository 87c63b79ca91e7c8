//! In-memory counters for one monitoring session.
//!
//! Nothing here is persisted; the counters live as long as the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Per-session activity counters.
#[derive(Debug)]
pub struct SessionStats {
    /// Frames sent to the detection engine
    frames_submitted: AtomicU64,
    /// Frames whose keypoints were classified
    frames_analyzed: AtomicU64,
    /// Frames dropped because a required keypoint was missing
    frames_skipped: AtomicU64,
    /// Frames in which the engine found no person
    frames_without_pose: AtomicU64,
    /// Frames the engine failed on
    detection_errors: AtomicU64,
    good_frames: AtomicU64,
    poor_frames: AtomicU64,
    /// Alerts raised by the debouncer
    alerts_fired: AtomicU64,
    /// Alerts that actually opened a surface
    alerts_shown: AtomicU64,
    /// Tones accepted by audio feedback
    tones_played: AtomicU64,
    session_id: Uuid,
    session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            frames_submitted: AtomicU64::new(0),
            frames_analyzed: AtomicU64::new(0),
            frames_skipped: AtomicU64::new(0),
            frames_without_pose: AtomicU64::new(0),
            detection_errors: AtomicU64::new(0),
            good_frames: AtomicU64::new(0),
            poor_frames: AtomicU64::new(0),
            alerts_fired: AtomicU64::new(0),
            alerts_shown: AtomicU64::new(0),
            tones_played: AtomicU64::new(0),
            session_id: Uuid::new_v4(),
            session_start: Utc::now(),
        }
    }

    pub fn record_frame_submitted(&self) {
        self.frames_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a classified frame.
    pub fn record_frame_analyzed(&self, is_good: bool) {
        self.frames_analyzed.fetch_add(1, Ordering::Relaxed);
        if is_good {
            self.good_frames.fetch_add(1, Ordering::Relaxed);
        } else {
            self.poor_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_frame_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_without_pose(&self) {
        self.frames_without_pose.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_error(&self) {
        self.detection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_fired(&self) {
        self.alerts_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_shown(&self) {
        self.alerts_shown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tone(&self) {
        self.tones_played.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            session_id: self.session_id,
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            frames_analyzed: self.frames_analyzed.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frames_without_pose: self.frames_without_pose.load(Ordering::Relaxed),
            detection_errors: self.detection_errors.load(Ordering::Relaxed),
            good_frames: self.good_frames.load(Ordering::Relaxed),
            poor_frames: self.poor_frames.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            alerts_shown: self.alerts_shown.load(Ordering::Relaxed),
            tones_played: self.tones_played.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Frames submitted: {}\n\
             - Frames analysed: {} ({} good, {} poor, {:.1}% good)\n\
             - Frames skipped (missing keypoints): {}\n\
             - Frames without a detected pose: {}\n\
             - Detection errors: {}\n\
             - Alerts fired: {} ({} shown)\n\
             - Tones played: {}",
            stats.frames_submitted,
            stats.frames_analyzed,
            stats.good_frames,
            stats.poor_frames,
            stats.good_ratio() * 100.0,
            stats.frames_skipped,
            stats.frames_without_pose,
            stats.detection_errors,
            stats.alerts_fired,
            stats.alerts_shown,
            stats.tones_played,
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.frames_submitted,
            &self.frames_analyzed,
            &self.frames_skipped,
            &self.frames_without_pose,
            &self.detection_errors,
            &self.good_frames,
            &self.poor_frames,
            &self.alerts_fired,
            &self.alerts_shown,
            &self.tones_played,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub session_id: Uuid,
    pub frames_submitted: u64,
    pub frames_analyzed: u64,
    pub frames_skipped: u64,
    pub frames_without_pose: u64,
    pub detection_errors: u64,
    pub good_frames: u64,
    pub poor_frames: u64,
    pub alerts_fired: u64,
    pub alerts_shown: u64,
    pub tones_played: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl StatsSnapshot {
    /// Share of analysed frames classified as good, 0 when none were analysed.
    pub fn good_ratio(&self) -> f64 {
        if self.frames_analyzed == 0 {
            0.0
        } else {
            self.good_frames as f64 / self.frames_analyzed as f64
        }
    }
}

/// Thread-safe shared session stats.
pub type SharedSessionStats = Arc<SessionStats>;

/// Create a new shared stats instance.
pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}
