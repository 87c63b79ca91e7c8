//! Tone sinks.
//!
//! - [`LogSink`] writes cues to the log and never fails
//! - [`RecordingSink`] keeps cues in memory for inspection
//! - [`RodioSink`] plays cues on the default output device (feature `audio`)

use super::{AudioUnavailableError, Cue, CueKind, ToneSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Logs each cue at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ToneSink for LogSink {
    fn play(&mut self, cue: &Cue) -> Result<(), AudioUnavailableError> {
        let hz: Vec<String> = cue
            .notes
            .iter()
            .map(|n| format!("{:.0}Hz", n.tone.frequency_hz))
            .collect();
        tracing::debug!("Tone {:?}: {}", cue.kind, hz.join(" "));
        Ok(())
    }
}

/// Records cues in memory. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    cues: Arc<Mutex<Vec<Cue>>>,
    unavailable: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `play` calls fail as if the device went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All cues received so far.
    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of cues of one kind.
    pub fn count(&self, kind: CueKind) -> usize {
        self.cues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.kind == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.cues.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cues.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl ToneSink for RecordingSink {
    fn play(&mut self, cue: &Cue) -> Result<(), AudioUnavailableError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AudioUnavailableError("recording sink marked unavailable".to_string()));
        }
        self.cues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cue.clone());
        Ok(())
    }
}

#[cfg(feature = "audio")]
pub use self::rodio_sink::RodioSink;

#[cfg(feature = "audio")]
mod rodio_sink {
    use super::super::synth::{render, SAMPLE_RATE};
    use super::super::{AudioUnavailableError, Cue, ToneSink};
    use crossbeam_channel::{bounded, Sender, TrySendError};
    use rodio::buffer::SamplesBuffer;
    use rodio::OutputStream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Plays cues on the default output device.
    ///
    /// The output stream is not `Send`, so it lives on a dedicated thread
    /// fed through a channel; `play` only enqueues.
    pub struct RodioSink {
        tx: Sender<Cue>,
        failed: Arc<AtomicBool>,
    }

    impl RodioSink {
        /// Open the default device. Fails if no output is available.
        pub fn open() -> Result<Self, AudioUnavailableError> {
            let (tx, rx) = bounded::<Cue>(32);
            let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
            let failed = Arc::new(AtomicBool::new(false));
            let thread_failed = Arc::clone(&failed);

            thread::Builder::new()
                .name("tone-output".to_string())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => {
                            let _ = ready_tx.send(Ok(()));
                            pair
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!(
                                "Failed to create audio output stream: {e}"
                            )));
                            return;
                        }
                    };

                    while let Ok(cue) = rx.recv() {
                        let samples = render(&cue, SAMPLE_RATE);
                        if let Err(e) = handle.play_raw(SamplesBuffer::new(1, SAMPLE_RATE, samples))
                        {
                            tracing::warn!("Failed to play tone: {}", e);
                            thread_failed.store(true, Ordering::SeqCst);
                            break;
                        }
                    }
                })
                .map_err(|e| AudioUnavailableError(e.to_string()))?;

            match ready_rx.recv() {
                Ok(Ok(())) => Ok(Self { tx, failed }),
                Ok(Err(e)) => Err(AudioUnavailableError(e)),
                Err(_) => Err(AudioUnavailableError(
                    "audio thread exited during startup".to_string(),
                )),
            }
        }
    }

    impl ToneSink for RodioSink {
        fn play(&mut self, cue: &Cue) -> Result<(), AudioUnavailableError> {
            if self.failed.load(Ordering::SeqCst) {
                return Err(AudioUnavailableError("audio output failed".to_string()));
            }
            match self.tx.try_send(cue.clone()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    tracing::debug!("Tone queue full, dropping cue");
                    Ok(())
                }
                Err(TrySendError::Disconnected(_)) => Err(AudioUnavailableError(
                    "audio thread is not running".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Cue, CLICK};

    #[test]
    fn test_recording_sink_shares_record() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();

        handle.play(&Cue::single(CueKind::Click, CLICK)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.count(CueKind::Click), 1);
        assert_eq!(sink.count(CueKind::Warning), 0);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_recording_sink_unavailable() {
        let mut sink = RecordingSink::new();
        sink.set_unavailable(true);
        assert!(sink.play(&Cue::single(CueKind::Click, CLICK)).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_log_sink_never_fails() {
        let mut sink = LogSink;
        assert!(sink.play(&Cue::single(CueKind::Click, CLICK)).is_ok());
    }
}
