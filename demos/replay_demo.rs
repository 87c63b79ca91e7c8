//! Replay the bundled slouch recording through a session and print what the
//! session reported.
//!
//! ```text
//! cargo run --example replay_demo
//! ```

use chrono::Utc;
use posture_watch::audio::{CueKind, RecordingSink};
use posture_watch::core::ManualClock;
use posture_watch::keypoints::Recording;
use posture_watch::session::engine;
use posture_watch::session::observer::{AlertEvent, PostureObserver, PostureVerdict};
use posture_watch::{Config, SessionController};
use std::path::Path;
use std::sync::Arc;

struct Printer;

impl PostureObserver for Printer {
    fn on_status(&mut self, message: &str) {
        println!("status:  {message}");
    }

    fn on_verdict(&mut self, verdict: &PostureVerdict) {
        if !verdict.classification.is_good {
            println!("verdict: {}", verdict.summary);
        }
    }

    fn on_alert_shown(&mut self, alert: &AlertEvent) {
        println!("ALERT #{} at {}", alert.id, alert.shown_at.format("%H:%M:%S%.3f"));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("posture_watch=info")
        .init();

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/slouch.jsonl");
    let recording = Recording::load(&path)?;

    let start = Utc::now();
    let clock = Arc::new(ManualClock::new(start));
    let (camera, replay_engine) = recording.into_replay(start, Arc::clone(&clock));

    let sink = RecordingSink::new();
    let mut session = SessionController::new(
        Config::default(),
        clock,
        Box::new(sink.clone()),
        Box::new(Printer),
    );

    session.load_engine(engine::ready(replay_engine)).await?;
    session.start_camera(Box::new(camera))?;
    session.start_detection()?;
    session.run().await?;
    session.return_to_idle();

    println!();
    println!("{}", session.stats().summary());
    println!(
        "Tones: {} bad edge, {} good edge, {} warning",
        sink.count(CueKind::BadEdge),
        sink.count(CueKind::GoodEdge),
        sink.count(CueKind::Warning)
    );
    Ok(())
}
