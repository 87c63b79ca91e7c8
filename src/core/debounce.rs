//! Temporal debouncing of per-frame posture classifications.
//!
//! A single poor frame never alerts. Poor posture must be observed
//! continuously for the dwell time before an alert fires; while it persists,
//! the alert repeats once per dwell window. One good frame clears the timer.
//!
//! Separately, the debouncer tracks good/poor transitions so audio cues play
//! only when the classification flips.

use crate::core::classifier::PostureClassification;
use crate::core::clock::span_ms;
use chrono::{DateTime, Duration, Utc};

/// Mutable debounce state, owned by one [`AlertDebouncer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceState {
    /// Classification of the previous frame, `None` until the first frame
    pub last_classification_good: Option<bool>,
    /// Start of the current dwell countdown
    pub bad_posture_since: Option<DateTime<Utc>>,
}

/// A change in classification between consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostureEdge {
    /// Poor -> good
    BecameGood,
    /// Good -> poor
    BecamePoor,
}

/// What the debouncer decided for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceOutcome {
    pub alert_fired: bool,
    pub edge: Option<PostureEdge>,
}

/// Hysteresis machine turning classifications into alert events.
#[derive(Debug)]
pub struct AlertDebouncer {
    dwell: Duration,
    state: DebounceState,
    /// When the last alert fired during the current poor run; the next
    /// countdown starts from here so alerts keep a steady cadence.
    rearmed_at: Option<DateTime<Utc>>,
}

impl AlertDebouncer {
    pub fn new(dwell_ms: u64) -> Self {
        Self {
            dwell: span_ms(dwell_ms),
            state: DebounceState::default(),
            rearmed_at: None,
        }
    }

    /// Feed one frame's classification observed at `now`.
    pub fn observe(
        &mut self,
        classification: &PostureClassification,
        now: DateTime<Utc>,
    ) -> DebounceOutcome {
        let mut outcome = DebounceOutcome::default();

        if classification.is_good {
            self.state.bad_posture_since = None;
            self.rearmed_at = None;
        } else {
            match self.state.bad_posture_since {
                None => {
                    self.state.bad_posture_since = Some(self.rearmed_at.take().unwrap_or(now));
                }
                Some(since) if now - since >= self.dwell => {
                    outcome.alert_fired = true;
                    self.state.bad_posture_since = None;
                    self.rearmed_at = Some(now);
                }
                Some(_) => {}
            }
        }

        outcome.edge = match (self.state.last_classification_good, classification.is_good) {
            (Some(false), true) => Some(PostureEdge::BecameGood),
            (Some(true), false) => Some(PostureEdge::BecamePoor),
            _ => None,
        };
        self.state.last_classification_good = Some(classification.is_good);

        outcome
    }

    /// Forget all history, as if no frame had been seen.
    pub fn reset(&mut self) {
        self.state = DebounceState::default();
        self.rearmed_at = None;
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }
}
