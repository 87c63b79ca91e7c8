//! Sample-level tone synthesis.
//!
//! Each note is an oscillator shaped by a short linear attack followed by an
//! exponential decay that reaches near-silence at the end of the note.

use super::{Cue, Tone, Waveform};
use std::f32::consts::PI;

pub const SAMPLE_RATE: u32 = 44_100;

/// Linear attack length.
const ATTACK_SECS: f32 = 0.01;

/// Gain reached at the end of the decay.
const DECAY_FLOOR: f32 = 0.001;

/// Oscillator output for a phase in `[0, 1)`, in `[-1, 1]`.
pub fn oscillator(waveform: Waveform, phase: f32) -> f32 {
    let phase = phase.rem_euclid(1.0);
    match waveform {
        Waveform::Sine => (2.0 * PI * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

/// Gain at `t` seconds into the note.
pub fn envelope(tone: &Tone, t: f32) -> f32 {
    if t < 0.0 || t >= tone.duration_secs || tone.volume <= 0.0 {
        return 0.0;
    }
    if t < ATTACK_SECS {
        return tone.volume * t / ATTACK_SECS;
    }
    if tone.volume <= DECAY_FLOOR || tone.duration_secs <= ATTACK_SECS {
        return tone.volume;
    }
    let progress = (t - ATTACK_SECS) / (tone.duration_secs - ATTACK_SECS);
    tone.volume * (DECAY_FLOOR / tone.volume).powf(progress)
}

/// Mono samples for one tone.
pub struct ToneSamples {
    tone: Tone,
    sample_rate: u32,
    index: u32,
    total: u32,
}

impl ToneSamples {
    pub fn new(tone: Tone, sample_rate: u32) -> Self {
        let total = (tone.duration_secs.max(0.0) * sample_rate as f32).round() as u32;
        Self {
            tone,
            sample_rate,
            index: 0,
            total,
        }
    }
}

impl Iterator for ToneSamples {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let t = self.index as f32 / self.sample_rate as f32;
        self.index += 1;

        let phase = (self.tone.frequency_hz * t).fract();
        Some(oscillator(self.tone.waveform, phase) * envelope(&self.tone, t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.index) as usize;
        (remaining, Some(remaining))
    }
}

/// Mix every note of a cue into one mono buffer.
pub fn render(cue: &Cue, sample_rate: u32) -> Vec<f32> {
    let len = ((cue.duration().as_nanos() * sample_rate as u128 + 999_999_999) / 1_000_000_000) as usize;
    let mut buffer = vec![0.0f32; len];

    for note in &cue.notes {
        let start = (note.offset.as_secs_f32() * sample_rate as f32).round() as usize;
        for (i, sample) in ToneSamples::new(note.tone, sample_rate).enumerate() {
            if let Some(slot) = buffer.get_mut(start + i) {
                *slot += sample;
            }
        }
    }

    for sample in &mut buffer {
        *sample = sample.clamp(-1.0, 1.0);
    }
    buffer
}
