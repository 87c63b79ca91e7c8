//! Rate-limited tone feedback.
//!
//! Every request passes two gates: the user's on/off toggle and a cooldown
//! measured from the last accepted tone. Requests that fail either gate are
//! dropped, never queued. Accepted tones are handed to a [`ToneSink`] which
//! synthesizes them off the caller's thread.
//!
//! If the sink reports that audio output is unavailable, feedback switches
//! itself off for the rest of the session without surfacing an error.

pub mod output;
pub mod synth;

use crate::core::clock::{span_ms, Clock};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use output::{LogSink, RecordingSink};

#[cfg(feature = "audio")]
pub use output::RodioSink;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// A single synthesized tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_secs: f32,
    pub waveform: Waveform,
    /// Peak gain, 0..=1
    pub volume: f32,
}

impl Tone {
    pub fn new(frequency_hz: f32, duration_secs: f32, waveform: Waveform, volume: f32) -> Self {
        Self {
            frequency_hz,
            duration_secs,
            waveform,
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

/// A tone scheduled relative to the start of its cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub offset: std::time::Duration,
    pub tone: Tone,
}

/// What a cue is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Tone,
    Click,
    GoodEdge,
    BadEdge,
    Warning,
    StartupChime,
}

/// One accepted synthesis request: one or more notes played as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub kind: CueKind,
    pub notes: Vec<Note>,
}

impl Cue {
    pub fn single(kind: CueKind, tone: Tone) -> Self {
        Self {
            kind,
            notes: vec![Note {
                offset: std::time::Duration::ZERO,
                tone,
            }],
        }
    }

    /// Time from the start of the cue until the last note ends.
    pub fn duration(&self) -> std::time::Duration {
        self.notes
            .iter()
            .map(|n| {
                let ms = (n.tone.duration_secs.max(0.0) * 1000.0).round() as u64;
                n.offset + std::time::Duration::from_millis(ms)
            })
            .max()
            .unwrap_or_default()
    }
}

pub const CLICK: Tone = Tone {
    frequency_hz: 800.0,
    duration_secs: 0.05,
    waveform: Waveform::Square,
    volume: 0.2,
};

pub const GOOD_EDGE: Tone = Tone {
    frequency_hz: 600.0,
    duration_secs: 0.15,
    waveform: Waveform::Sine,
    volume: 0.15,
};

pub const BAD_EDGE: Tone = Tone {
    frequency_hz: 200.0,
    duration_secs: 0.3,
    waveform: Waveform::Sawtooth,
    volume: 0.15,
};

/// Volume used when a caller does not pick one.
pub const DEFAULT_VOLUME: f32 = 0.3;

/// Ascending startup sequence (Hz).
pub const STARTUP_CHIME_HZ: [f32; 4] = [220.0, 330.0, 440.0, 550.0];

/// Spacing between startup chime notes.
pub const STARTUP_CHIME_SPACING_MS: u64 = 50;

/// The audio subsystem cannot produce sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUnavailableError(pub String);

impl std::fmt::Display for AudioUnavailableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Audio unavailable: {}", self.0)
    }
}

impl std::error::Error for AudioUnavailableError {}

/// Destination for accepted cues.
///
/// `play` must return promptly; synthesis happens asynchronously.
pub trait ToneSink: Send {
    fn play(&mut self, cue: &Cue) -> Result<(), AudioUnavailableError>;
}

/// Toggle and rate-limit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioState {
    pub enabled: bool,
    pub last_played_at: Option<DateTime<Utc>>,
}

/// Audio feedback controller.
pub struct AudioFeedback {
    /// `None` once output has been found unavailable
    sink: Option<Box<dyn ToneSink>>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    state: AudioState,
}

impl AudioFeedback {
    pub fn new(
        sink: Box<dyn ToneSink>,
        clock: Arc<dyn Clock>,
        cooldown_ms: u64,
        enabled: bool,
    ) -> Self {
        Self {
            sink: Some(sink),
            clock,
            cooldown: span_ms(cooldown_ms),
            state: AudioState {
                enabled,
                last_played_at: None,
            },
        }
    }

    /// A controller whose output could not be opened. Every request is a no-op.
    pub fn unavailable(clock: Arc<dyn Clock>, cooldown_ms: u64, reason: &AudioUnavailableError) -> Self {
        tracing::warn!("Audio feedback disabled: {}", reason);
        Self {
            sink: None,
            clock,
            cooldown: span_ms(cooldown_ms),
            state: AudioState {
                enabled: false,
                last_played_at: None,
            },
        }
    }

    /// Request an arbitrary tone. Returns whether it was accepted.
    pub fn play_tone(
        &mut self,
        frequency_hz: f32,
        duration_secs: f32,
        waveform: Waveform,
        volume: f32,
    ) -> bool {
        let tone = Tone::new(frequency_hz, duration_secs, waveform, volume);
        self.request(Cue::single(CueKind::Tone, tone))
    }

    /// Request a sine tone at the default volume.
    pub fn play_sine(&mut self, frequency_hz: f32, duration_secs: f32) -> bool {
        self.play_tone(frequency_hz, duration_secs, Waveform::Sine, DEFAULT_VOLUME)
    }

    /// UI click.
    pub fn play_click(&mut self) -> bool {
        self.request(Cue::single(CueKind::Click, CLICK))
    }

    /// Posture just turned good.
    pub fn play_good_edge(&mut self) -> bool {
        self.request(Cue::single(CueKind::GoodEdge, GOOD_EDGE))
    }

    /// Posture just turned poor.
    pub fn play_bad_edge(&mut self) -> bool {
        self.request(Cue::single(CueKind::BadEdge, BAD_EDGE))
    }

    /// Alert surface opened, or a lifecycle step failed.
    pub fn play_warning(&mut self) -> bool {
        self.request(Cue::single(CueKind::Warning, BAD_EDGE))
    }

    /// Ascending four-note chime, accepted or dropped as a single request.
    pub fn play_startup_chime(&mut self) -> bool {
        let notes = STARTUP_CHIME_HZ
            .iter()
            .enumerate()
            .map(|(i, &hz)| Note {
                offset: std::time::Duration::from_millis(i as u64 * STARTUP_CHIME_SPACING_MS),
                tone: Tone::new(hz, 0.1, Waveform::Sine, 0.15),
            })
            .collect();
        self.request(Cue {
            kind: CueKind::StartupChime,
            notes,
        })
    }

    /// Flip the user toggle and return the new setting.
    ///
    /// Stays off once output is unavailable.
    pub fn toggle(&mut self) -> bool {
        if self.sink.is_none() {
            return false;
        }
        self.state.enabled = !self.state.enabled;
        tracing::info!(
            "Audio feedback {}",
            if self.state.enabled { "on" } else { "off" }
        );
        self.state.enabled
    }

    /// Forget the last tone time so the next request is not rate limited.
    pub fn reset_cooldown(&mut self) {
        self.state.last_played_at = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    fn request(&mut self, cue: Cue) -> bool {
        if !self.state.enabled {
            return false;
        }
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };

        let now = self.clock.now();
        if let Some(last) = self.state.last_played_at {
            if now - last < self.cooldown {
                tracing::trace!("Dropping {:?} cue inside cooldown", cue.kind);
                return false;
            }
        }
        self.state.last_played_at = Some(now);

        match sink.play(&cue) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Disabling audio feedback: {}", e);
                self.sink = None;
                self.state.enabled = false;
                false
            }
        }
    }
}
