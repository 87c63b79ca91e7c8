//! Session lifecycle and the frame loop.
//!
//! ```text
//!   Idle ──start_camera──▶ CameraActive ──start_detection──▶ Detecting
//!    ▲                                                        │    ▲
//!    │                                          stop_detection│    │start_detection
//!    │                                                        ▼    │
//!    └─────────────────── return_to_idle (any state) ──────── Stopped
//! ```
//!
//! The frame loop submits one frame, waits for the engine's answer, runs the
//! whole analysis pipeline on it, and only then submits the next frame. A
//! stop request is honoured before the next submission.

pub mod alert;
pub mod engine;
pub mod observer;

use crate::audio::{AudioFeedback, ToneSink};
use crate::config::Config;
use crate::core::classifier::{classify, PostureClassification};
use crate::core::clock::Clock;
use crate::core::debounce::{AlertDebouncer, DebounceState, PostureEdge};
use crate::core::metrics::{extract_metrics, PostureMetrics};
use crate::keypoints::KeypointSet;
use crate::stats::{create_shared_stats, SharedSessionStats};
use alert::AlertSurface;
use engine::{Camera, Detection, DetectionEngine, DetectionError, EngineReady};
use observer::{AlertEvent, DismissReason, MetricsReadout, PostureObserver, PostureVerdict};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CameraActive,
    Detecting,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::CameraActive => "camera active",
            SessionState::Detecting => "detecting",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lifecycle failures. Frame-level problems never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    CameraAcquisition(String),
    EngineLoad(String),
    EngineNotLoaded,
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::CameraAcquisition(e) => write!(f, "Camera acquisition failed: {e}"),
            SessionError::EngineLoad(e) => write!(f, "Detection engine failed to load: {e}"),
            SessionError::EngineNotLoaded => write!(f, "Detection engine is not loaded"),
            SessionError::InvalidTransition { from, action } => {
                write!(f, "Cannot {action} while {from}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Result of analysing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub metrics: PostureMetrics,
    pub classification: PostureClassification,
    /// The debouncer raised an alert on this frame
    pub alert_fired: bool,
    /// The alert opened a surface (it is suppressed if one is already open)
    pub alert_shown: bool,
    pub edge: Option<PostureEdge>,
}

/// Cooperative cancellation for a running frame loop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the loop to stop before its next submission.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_detecting(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Orchestrates camera, engine, analysis and feedback for one user.
pub struct SessionController {
    config: Config,
    clock: Arc<dyn Clock>,
    state: SessionState,
    detecting: Arc<AtomicBool>,
    camera: Option<Box<dyn Camera>>,
    engine: Option<Box<dyn DetectionEngine>>,
    debouncer: AlertDebouncer,
    audio: AudioFeedback,
    alerts: AlertSurface,
    observer: Box<dyn PostureObserver>,
    stats: SharedSessionStats,
}

impl SessionController {
    /// Create a session whose audio plays through `sink`.
    pub fn new(
        config: Config,
        clock: Arc<dyn Clock>,
        sink: Box<dyn ToneSink>,
        observer: Box<dyn PostureObserver>,
    ) -> Self {
        let audio = AudioFeedback::new(
            sink,
            Arc::clone(&clock),
            config.thresholds.audio_cooldown_ms,
            config.audio_enabled,
        );
        Self::with_audio(config, clock, audio, observer)
    }

    /// Create a session around an already-built audio controller.
    pub fn with_audio(
        config: Config,
        clock: Arc<dyn Clock>,
        audio: AudioFeedback,
        observer: Box<dyn PostureObserver>,
    ) -> Self {
        Self {
            debouncer: AlertDebouncer::new(config.thresholds.dwell_ms),
            alerts: AlertSurface::new(config.alert_auto_dismiss),
            config,
            clock,
            state: SessionState::Idle,
            detecting: Arc::new(AtomicBool::new(false)),
            camera: None,
            engine: None,
            audio,
            observer,
            stats: create_shared_stats(),
        }
    }

    /// Wait for the detection engine to become ready.
    pub async fn load_engine(&mut self, ready: EngineReady) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "load the detection engine",
            });
        }

        self.status("Loading pose detection model...");
        let result = match ready.await {
            Ok(result) => result,
            Err(_) => Err("loader dropped before signalling readiness".to_string()),
        };

        match result {
            Ok(engine) => {
                self.engine = Some(engine);
                self.status("Pose detection model loaded. Start the camera to begin.");
                self.cue(AudioFeedback::play_startup_chime);
                Ok(())
            }
            Err(reason) => {
                tracing::error!("Detection engine failed to load: {}", reason);
                self.status("Error loading pose detection model");
                self.cue(AudioFeedback::play_warning);
                Err(SessionError::EngineLoad(reason))
            }
        }
    }

    /// `Idle -> CameraActive`.
    pub fn start_camera(&mut self, mut camera: Box<dyn Camera>) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "start the camera",
            });
        }

        self.status("Starting camera...");
        match camera.acquire() {
            Ok(()) => {
                self.camera = Some(camera);
                self.transition(SessionState::CameraActive);
                self.status("Camera started. Start detection to begin posture analysis.");
                self.cue(AudioFeedback::play_click);
                Ok(())
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.status("Error accessing camera");
                self.cue(AudioFeedback::play_warning);
                Err(SessionError::CameraAcquisition(e.0))
            }
        }
    }

    /// `CameraActive | Stopped -> Detecting`.
    pub fn start_detection(&mut self) -> Result<(), SessionError> {
        if !matches!(
            self.state,
            SessionState::CameraActive | SessionState::Stopped
        ) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "start detection",
            });
        }
        if self.engine.is_none() {
            return Err(SessionError::EngineNotLoaded);
        }

        self.detecting.store(true, Ordering::SeqCst);
        self.transition(SessionState::Detecting);
        self.status("Detection started - analyzing your posture...");
        self.cue(AudioFeedback::play_click);
        Ok(())
    }

    /// `Detecting -> Stopped`. The camera stays open.
    ///
    /// Debounce history is cleared here as well as on teardown: a resumed
    /// run starts with no previous classification and no dwell timer.
    pub fn stop_detection(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Detecting {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "stop detection",
            });
        }

        self.halt_detection();
        self.status("Detection stopped");
        self.cue(AudioFeedback::play_click);
        Ok(())
    }

    /// Any state `-> Idle`: stop detection, release the camera and clear
    /// alert and audio timing state. The loaded engine is kept.
    pub fn return_to_idle(&mut self) {
        if self.state == SessionState::Detecting {
            self.halt_detection();
        }

        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }

        self.debouncer.reset();
        self.audio.reset_cooldown();
        if let Some(alert) = self.alerts.dismiss() {
            self.observer
                .on_alert_dismissed(&alert, DismissReason::SessionReset);
        }

        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
        self.status("Ready to start");
        self.cue(AudioFeedback::play_click);
    }

    /// Run the frame loop until stopped or the camera stream ends.
    ///
    /// Returns the number of frames submitted. Ends in `Stopped`.
    pub async fn run(&mut self) -> Result<u64, SessionError> {
        if self.state != SessionState::Detecting {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "run the frame loop",
            });
        }

        let mut submitted = 0u64;
        while self.detecting.load(Ordering::SeqCst) {
            let Some(frame) = self.camera.as_mut().and_then(|c| c.next_frame()) else {
                tracing::info!("Camera stream ended after {} frames", submitted);
                break;
            };
            let Some(engine) = self.engine.as_mut() else {
                return Err(SessionError::EngineNotLoaded);
            };

            self.stats.record_frame_submitted();
            submitted += 1;
            let pending = engine.submit(frame);

            let detection = match pending.await {
                Ok(detection) => detection,
                Err(_) => Err(DetectionError(format!(
                    "engine dropped frame {} without answering",
                    frame.sequence
                ))),
            };
            self.handle_detection(detection);

            tokio::task::yield_now().await;
        }

        if self.state == SessionState::Detecting {
            self.stop_detection()?;
        }
        Ok(submitted)
    }

    /// Route one engine answer through the pipeline.
    pub fn handle_detection(&mut self, detection: Detection) -> Option<FrameReport> {
        self.tick();
        match detection {
            Ok(Some(keypoints)) => self.process_keypoints(&keypoints),
            Ok(None) => {
                tracing::trace!("No pose in frame");
                self.stats.record_frame_without_pose();
                None
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.stats.record_detection_error();
                None
            }
        }
    }

    /// Analyse one frame of keypoints: metrics, classification, debounce,
    /// alerts and edge tones.
    ///
    /// Frames missing a required keypoint are skipped and leave every piece
    /// of state untouched.
    pub fn process_keypoints(&mut self, keypoints: &KeypointSet) -> Option<FrameReport> {
        self.tick();
        let now = self.clock.now();
        let thresholds = self.config.thresholds;

        let metrics = match extract_metrics(keypoints, &thresholds) {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::debug!("Skipping frame: {}", e);
                self.stats.record_frame_skipped();
                return None;
            }
        };
        self.observer.on_readout(&MetricsReadout::from_metrics(&metrics));

        let classification = classify(&metrics, &thresholds);
        self.stats.record_frame_analyzed(classification.is_good);

        let outcome = self.debouncer.observe(&classification, now);

        let mut alert_shown = false;
        if outcome.alert_fired {
            self.stats.record_alert_fired();
            tracing::info!("Sustained poor posture: {:?}", classification.issues);
            if let Some(alert) = self.alerts.show(&classification.issues, now) {
                self.stats.record_alert_shown();
                self.observer.on_alert_shown(&alert);
                self.cue(AudioFeedback::play_warning);
                alert_shown = true;
            }
        }

        match outcome.edge {
            Some(PostureEdge::BecameGood) => self.cue(AudioFeedback::play_good_edge),
            Some(PostureEdge::BecamePoor) => self.cue(AudioFeedback::play_bad_edge),
            None => {}
        }

        tracing::debug!(
            "Shoulder angle: {:.1}°, forward head: {:.1}%, slouch: {:.1}%",
            metrics.shoulder_angle_deg,
            metrics.forward_head_ratio * 100.0,
            metrics.shoulder_slouch_ratio * 100.0
        );
        self.observer
            .on_verdict(&PostureVerdict::new(classification.clone()));

        Some(FrameReport {
            metrics,
            classification,
            alert_fired: outcome.alert_fired,
            alert_shown,
            edge: outcome.edge,
        })
    }

    /// Close the visible alert if its auto-dismiss time has passed.
    ///
    /// Runs on every engine answer. Hosts call it periodically while no
    /// frames flow, e.g. when detection is stopped.
    pub fn tick(&mut self) -> Option<AlertEvent> {
        let alert = self.alerts.expire(self.clock.now())?;
        self.observer.on_alert_dismissed(&alert, DismissReason::Timeout);
        Some(alert)
    }

    /// Close the visible alert on user request.
    pub fn dismiss_alert(&mut self) -> Option<AlertEvent> {
        let alert = self.alerts.dismiss()?;
        self.observer.on_alert_dismissed(&alert, DismissReason::User);
        self.cue(AudioFeedback::play_click);
        Some(alert)
    }

    /// Flip audio feedback on or off; returns the new setting.
    pub fn toggle_audio(&mut self) -> bool {
        let enabled = self.audio.toggle();
        self.observer.on_audio_toggled(enabled);
        if enabled {
            self.cue(AudioFeedback::play_click);
        }
        enabled
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.detecting))
    }

    pub fn engine_loaded(&self) -> bool {
        self.engine.is_some()
    }

    pub fn debounce_state(&self) -> DebounceState {
        self.debouncer.state()
    }

    pub fn audio(&self) -> &AudioFeedback {
        &self.audio
    }

    pub fn current_alert(&self) -> Option<&AlertEvent> {
        self.alerts.current()
    }

    pub fn stats(&self) -> SharedSessionStats {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn halt_detection(&mut self) {
        self.tick();
        self.detecting.store(false, Ordering::SeqCst);
        self.debouncer.reset();
        self.observer.on_readout(&MetricsReadout::cleared());
        self.transition(SessionState::Stopped);
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        self.state = to;
        tracing::info!("Session {} -> {}", from, to);
        self.observer.on_state_changed(from, to);
    }

    fn status(&mut self, message: &str) {
        tracing::info!("Status: {}", message);
        self.observer.on_status(message);
    }

    fn cue(&mut self, play: fn(&mut AudioFeedback) -> bool) {
        if play(&mut self.audio) {
            self.stats.record_tone();
        }
    }
}
