//! Observer interface through which the session reports to a UI.

use super::SessionState;
use crate::core::classifier::{PostureClassification, PostureIssue};
use crate::core::metrics::{PostureMetrics, DEGENERATE_FORWARD_HEAD_RATIO};
use chrono::{DateTime, Utc};

/// Placeholder shown when there is no measurement.
pub const NO_READING: &str = "--°";

/// Display-ready metric values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsReadout {
    /// Shoulder tilt, e.g. `"3.4°"`
    pub shoulder_angle: String,
    /// Forward head ratio as a percentage, e.g. `"12.5%"`
    pub forward_head: String,
}

impl MetricsReadout {
    pub fn from_metrics(metrics: &PostureMetrics) -> Self {
        let forward_head = if metrics.forward_head_ratio >= DEGENERATE_FORWARD_HEAD_RATIO {
            "--%".to_string()
        } else {
            format!("{:.1}%", metrics.forward_head_ratio * 100.0)
        };
        Self {
            shoulder_angle: format!("{:.1}°", metrics.shoulder_angle_deg),
            forward_head,
        }
    }

    /// Readout shown while not detecting.
    pub fn cleared() -> Self {
        Self {
            shoulder_angle: NO_READING.to_string(),
            forward_head: NO_READING.to_string(),
        }
    }
}

/// Display-ready classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostureVerdict {
    /// `"Good posture"` or `"Poor posture"`
    pub status: &'static str,
    /// Issue list with remediation advice
    pub summary: String,
    pub classification: PostureClassification,
}

impl PostureVerdict {
    pub fn new(classification: PostureClassification) -> Self {
        Self {
            status: classification.status_text(),
            summary: classification.summary(),
            classification,
        }
    }
}

/// A visible posture warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub id: u64,
    pub shown_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Issues present in the frame that raised the alert
    pub issues: Vec<PostureIssue>,
}

/// Why an alert went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    User,
    Timeout,
    SessionReset,
}

/// Receives session output. Every method defaults to doing nothing.
pub trait PostureObserver: Send {
    fn on_status(&mut self, _message: &str) {}

    fn on_state_changed(&mut self, _from: SessionState, _to: SessionState) {}

    fn on_readout(&mut self, _readout: &MetricsReadout) {}

    fn on_verdict(&mut self, _verdict: &PostureVerdict) {}

    fn on_alert_shown(&mut self, _alert: &AlertEvent) {}

    fn on_alert_dismissed(&mut self, _alert: &AlertEvent, _reason: DismissReason) {}

    fn on_audio_toggled(&mut self, _enabled: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PostureObserver for NullObserver {}
