//! End-to-end tests for a monitoring session driven by recorded or scripted
//! keypoint streams.

use chrono::{DateTime, Duration, Utc};
use posture_watch::audio::{CueKind, RecordingSink};
use posture_watch::core::{Clock, DebounceState, ManualClock, PostureEdge};
use posture_watch::keypoints::{Keypoint, KeypointSet, Landmark, RecordedFrame, Recording};
use posture_watch::session::engine::{
    self, Camera, CameraError, Detection, DetectionEngine, DetectionError, Frame,
};
use posture_watch::session::observer::{AlertEvent, DismissReason, PostureObserver, PostureVerdict};
use posture_watch::session::{SessionController, SessionState, StopHandle};
use posture_watch::Config;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

fn upright() -> KeypointSet {
    let mut set = KeypointSet::default();
    set.set(Landmark::Nose, Keypoint::new(0.50, 0.30));
    set.set(Landmark::LeftEye, Keypoint::new(0.52, 0.28));
    set.set(Landmark::RightEye, Keypoint::new(0.48, 0.28));
    set.set(Landmark::LeftEar, Keypoint::new(0.56, 0.30));
    set.set(Landmark::RightEar, Keypoint::new(0.44, 0.30));
    set.set(Landmark::LeftShoulder, Keypoint::new(0.65, 0.55));
    set.set(Landmark::RightShoulder, Keypoint::new(0.35, 0.55));
    set
}

/// Upright except for a head pushed well ahead of the shoulders.
fn head_forward() -> KeypointSet {
    let mut set = upright();
    set.set(Landmark::LeftEye, Keypoint::new(0.62, 0.28));
    set.set(Landmark::RightEye, Keypoint::new(0.58, 0.28));
    set
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Verdict(&'static str),
    AlertShown(AlertEvent),
    AlertDismissed(u64, DismissReason),
    AudioToggled(bool),
}

#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    fn alerts_shown(&self) -> Vec<AlertEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::AlertShown(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }
}

impl PostureObserver for EventLog {
    fn on_verdict(&mut self, verdict: &PostureVerdict) {
        self.0.lock().unwrap().push(Event::Verdict(verdict.status));
    }

    fn on_alert_shown(&mut self, alert: &AlertEvent) {
        self.0.lock().unwrap().push(Event::AlertShown(alert.clone()));
    }

    fn on_alert_dismissed(&mut self, alert: &AlertEvent, reason: DismissReason) {
        self.0
            .lock()
            .unwrap()
            .push(Event::AlertDismissed(alert.id, reason));
    }

    fn on_audio_toggled(&mut self, enabled: bool) {
        self.0.lock().unwrap().push(Event::AudioToggled(enabled));
    }
}

struct Harness {
    session: SessionController,
    sink: RecordingSink,
    clock: Arc<ManualClock>,
    events: EventLog,
    start: DateTime<Utc>,
}

fn harness(config: Config) -> Harness {
    let start = Utc::now();
    let clock = Arc::new(ManualClock::new(start));
    let sink = RecordingSink::new();
    let events = EventLog::default();
    let session = SessionController::new(
        config,
        clock.clone(),
        Box::new(sink.clone()),
        Box::new(events.clone()),
    );
    Harness {
        session,
        sink,
        clock,
        events,
        start,
    }
}

async fn replay(h: &mut Harness, recording: Recording) -> u64 {
    let (camera, replay_engine) = recording.into_replay(h.start, h.clock.clone());
    h.session
        .load_engine(engine::ready(replay_engine))
        .await
        .expect("engine loads");
    h.session.start_camera(Box::new(camera)).expect("camera");
    h.session.start_detection().expect("detection");
    h.session.run().await.expect("frame loop")
}

/// Frames every 100ms: upright up to `poor_from_ms`, then head forward.
fn sustained_poor(poor_from_ms: u64, until_ms: u64) -> Recording {
    let frames = (0..=until_ms)
        .step_by(100)
        .map(|t_ms| RecordedFrame {
            t_ms,
            keypoints: Some(if t_ms < poor_from_ms {
                upright()
            } else {
                head_forward()
            }),
        })
        .collect();
    Recording::new(frames)
}

#[tokio::test]
async fn test_sustained_poor_posture_alerts_once_per_dwell() {
    let mut h = harness(Config::default());

    let submitted = replay(&mut h, sustained_poor(200, 5200)).await;
    assert_eq!(submitted, 53);
    assert_eq!(h.session.state(), SessionState::Stopped);

    let stats = h.session.stats().snapshot();
    assert_eq!(stats.frames_analyzed, 53);
    assert_eq!(stats.good_frames, 2);
    assert_eq!(stats.alerts_fired, 2);
    // The second alert lands while the first is still on screen.
    assert_eq!(stats.alerts_shown, 1);

    let shown = h.events.alerts_shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].shown_at, h.start + Duration::milliseconds(2200));

    assert_eq!(h.sink.count(CueKind::BadEdge), 1);
    assert_eq!(h.sink.count(CueKind::GoodEdge), 0);
    assert_eq!(h.sink.count(CueKind::Warning), 1);
}

#[tokio::test]
async fn test_dwell_override_changes_alert_cadence() {
    let mut config = Config::default();
    config.thresholds.dwell_ms = 1000;
    config.alert_auto_dismiss = std::time::Duration::from_millis(500);
    let mut h = harness(config);

    replay(&mut h, sustained_poor(0, 3000)).await;

    let stats = h.session.stats().snapshot();
    assert_eq!(stats.alerts_fired, 3);
    assert_eq!(stats.alerts_shown, 3);

    let dismissed = h
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::AlertDismissed(_, DismissReason::Timeout)))
        .count();
    assert_eq!(dismissed, 2);
}

#[tokio::test]
async fn test_recovery_plays_good_edge() {
    let mut h = harness(Config::default());
    let mut frames = Vec::new();
    for (i, t_ms) in (0..1000).step_by(100).enumerate() {
        let keypoints = if (3..6).contains(&i) {
            head_forward()
        } else {
            upright()
        };
        frames.push(RecordedFrame {
            t_ms,
            keypoints: Some(keypoints),
        });
    }

    replay(&mut h, Recording::new(frames)).await;

    assert_eq!(h.sink.count(CueKind::BadEdge), 1);
    assert_eq!(h.sink.count(CueKind::GoodEdge), 1);
    assert_eq!(h.session.stats().snapshot().alerts_fired, 0);

    let verdicts: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Verdict(status) => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(verdicts.len(), 10);
    assert_eq!(verdicts[3], "Poor posture");
    assert_eq!(verdicts[6], "Good posture");
}

#[tokio::test]
async fn test_incomplete_frames_are_skipped() {
    let mut h = harness(Config::default());

    let mut no_nose = head_forward();
    no_nose.clear(Landmark::Nose);
    let mut no_shoulder = head_forward();
    no_shoulder.clear(Landmark::RightShoulder);

    let recording = Recording::new(vec![
        RecordedFrame {
            t_ms: 0,
            keypoints: Some(head_forward()),
        },
        RecordedFrame {
            t_ms: 1000,
            keypoints: Some(no_nose),
        },
        RecordedFrame {
            t_ms: 2500,
            keypoints: None,
        },
        RecordedFrame {
            t_ms: 3000,
            keypoints: Some(no_shoulder),
        },
    ]);
    replay(&mut h, recording).await;

    let stats = h.session.stats().snapshot();
    assert_eq!(stats.frames_submitted, 4);
    assert_eq!(stats.frames_analyzed, 1);
    assert_eq!(stats.frames_skipped, 2);
    assert_eq!(stats.frames_without_pose, 1);
    // Skipped frames never reach the debouncer, so no alert fires.
    assert_eq!(stats.alerts_fired, 0);
}

#[test]
fn test_disabled_audio_stays_silent_until_reenabled() {
    let mut h = harness(Config::default());

    assert!(!h.session.toggle_audio());
    assert!(!h.session.audio().is_enabled());

    for i in 0..30 {
        h.clock.advance_ms(250);
        let keypoints = if i % 2 == 0 { head_forward() } else { upright() };
        h.session.process_keypoints(&keypoints);
    }
    assert!(h.sink.is_empty());

    h.clock.advance_ms(250);
    assert!(h.session.toggle_audio());
    assert_eq!(h.sink.count(CueKind::Click), 1);

    h.clock.advance_ms(250);
    let report = h.session.process_keypoints(&head_forward()).unwrap();
    assert_eq!(report.edge, Some(PostureEdge::BecamePoor));
    assert_eq!(h.sink.count(CueKind::BadEdge), 1);

    assert_eq!(
        h.events.events()[..2],
        [Event::AudioToggled(false), Event::Verdict("Poor posture")]
    );
}

#[test]
fn test_independent_sessions() {
    let mut a = harness(Config::default());
    let mut b = harness(Config::default());

    a.session.process_keypoints(&head_forward());
    a.clock.advance_ms(2000);
    assert!(a.session.process_keypoints(&head_forward()).unwrap().alert_fired);

    b.clock.advance_ms(2000);
    let report = b.session.process_keypoints(&head_forward()).unwrap();
    assert!(!report.alert_fired);
    assert!(b.session.current_alert().is_none());
    assert!(a.session.current_alert().is_some());
}

#[tokio::test]
async fn test_return_to_idle_clears_session_state() {
    let mut h = harness(Config::default());
    replay(&mut h, sustained_poor(0, 2500)).await;
    assert!(h.session.current_alert().is_some());

    // Stopping at the end of the stream played a click at 2500ms.
    let teardown_at = h.start + Duration::milliseconds(2500);
    assert_eq!(h.session.audio().state().last_played_at, Some(teardown_at));
    let clicks = h.sink.count(CueKind::Click);

    // Same instant: the click is only accepted because teardown clears the cooldown.
    h.session.return_to_idle();

    assert_eq!(h.sink.count(CueKind::Click), clicks + 1);
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.session.current_alert().is_none());
    assert_eq!(h.session.debounce_state(), DebounceState::default());
    assert!(matches!(
        h.events.events().last(),
        Some(Event::AlertDismissed(1, DismissReason::SessionReset))
    ));
    assert!(h.session.engine_loaded());
}

#[tokio::test]
async fn test_alert_closes_after_person_leaves_frame() {
    let mut h = harness(Config::default());
    let frames = (0..=12_500u64)
        .step_by(100)
        .map(|t_ms| RecordedFrame {
            t_ms,
            keypoints: (t_ms <= 2000).then(head_forward),
        })
        .collect();

    replay(&mut h, Recording::new(frames)).await;

    let stats = h.session.stats().snapshot();
    assert_eq!(stats.alerts_shown, 1);
    assert_eq!(stats.frames_without_pose, 105);
    assert!(h.session.current_alert().is_none());
    assert!(h
        .events
        .events()
        .contains(&Event::AlertDismissed(1, DismissReason::Timeout)));
}

/// Produces frames forever, advancing the clock 100ms per frame.
struct EndlessCamera {
    clock: Arc<ManualClock>,
    next: u64,
}

impl Camera for EndlessCamera {
    fn acquire(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        self.clock.advance_ms(100);
        let frame = Frame {
            sequence: self.next,
            captured_at: self.clock.now(),
        };
        self.next += 1;
        Some(frame)
    }

    fn release(&mut self) {}
}

/// Requests a stop once it has seen `stop_after` frames.
struct StoppingEngine {
    stop: Option<StopHandle>,
    stop_after: u64,
    seen: u64,
}

impl DetectionEngine for StoppingEngine {
    fn submit(&mut self, _frame: Frame) -> oneshot::Receiver<Detection> {
        self.seen += 1;
        if self.seen == self.stop_after {
            if let Some(stop) = &self.stop {
                stop.stop();
            }
        }
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Ok(Some(upright())));
        rx
    }
}

#[tokio::test]
async fn test_stop_handle_ends_frame_loop() {
    let mut h = harness(Config::default());
    let stop = h.session.stop_handle();

    h.session
        .load_engine(engine::ready(StoppingEngine {
            stop: Some(stop.clone()),
            stop_after: 5,
            seen: 0,
        }))
        .await
        .unwrap();
    h.session
        .start_camera(Box::new(EndlessCamera {
            clock: h.clock.clone(),
            next: 0,
        }))
        .unwrap();
    h.session.start_detection().unwrap();
    assert!(stop.is_detecting());

    let submitted = h.session.run().await.unwrap();

    // The in-flight frame completes; nothing is submitted after the stop.
    assert_eq!(submitted, 5);
    assert_eq!(h.session.stats().snapshot().frames_analyzed, 5);
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert!(!stop.is_detecting());

    // Detection can resume from Stopped.
    h.session.start_detection().unwrap();
    assert_eq!(h.session.state(), SessionState::Detecting);
}

/// Fails every other frame and drops the answer on every fifth.
struct FlakyEngine;

impl DetectionEngine for FlakyEngine {
    fn submit(&mut self, frame: Frame) -> oneshot::Receiver<Detection> {
        let (tx, rx) = oneshot::channel();
        if frame.sequence % 5 == 4 {
            drop(tx);
        } else if frame.sequence % 2 == 1 {
            let _ = tx.send(Err(DetectionError("inference failed".to_string())));
        } else {
            let _ = tx.send(Ok(Some(upright())));
        }
        rx
    }
}

/// Emits a fixed number of frames.
struct FiniteCamera {
    remaining: u64,
    next: u64,
    clock: Arc<ManualClock>,
}

impl Camera for FiniteCamera {
    fn acquire(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.clock.advance_ms(100);
        let frame = Frame {
            sequence: self.next,
            captured_at: self.clock.now(),
        };
        self.next += 1;
        Some(frame)
    }

    fn release(&mut self) {}
}

#[tokio::test]
async fn test_engine_failures_do_not_end_detection() {
    let mut h = harness(Config::default());
    h.session
        .load_engine(engine::ready(FlakyEngine))
        .await
        .unwrap();
    h.session
        .start_camera(Box::new(FiniteCamera {
            remaining: 10,
            next: 0,
            clock: h.clock.clone(),
        }))
        .unwrap();
    h.session.start_detection().unwrap();

    assert_eq!(h.session.run().await.unwrap(), 10);

    // Sequences 0..10: dropped at 4 and 9, errors at 1, 3, 5, 7.
    let stats = h.session.stats().snapshot();
    assert_eq!(stats.frames_submitted, 10);
    assert_eq!(stats.detection_errors, 6);
    assert_eq!(stats.frames_analyzed, 4);
}

#[tokio::test]
async fn test_failed_engine_load_keeps_session_idle() {
    let mut h = harness(Config::default());

    let err = h
        .session
        .load_engine(engine::failed("model download failed"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("model download failed"));
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.sink.count(CueKind::Warning), 1);
    assert_eq!(h.sink.count(CueKind::StartupChime), 0);
}

#[tokio::test]
async fn test_camera_denied_keeps_session_idle() {
    let mut h = harness(Config::default());
    let (camera, _engine) = Recording::default().into_replay(h.start, h.clock.clone());

    assert!(h.session.start_camera(Box::new(camera)).is_err());
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.sink.count(CueKind::Warning), 1);
}
