//! Posture Watch CLI
//!
//! Replays recorded keypoint streams through a full monitoring session.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use posture_watch::{
    audio::{AudioFeedback, LogSink},
    core::{classify, extract_metrics, Clock, ManualClock},
    keypoints::{KeypointSet, Recording},
    session::{
        engine,
        observer::{AlertEvent, DismissReason, MetricsReadout, PostureObserver, PostureVerdict},
        SessionController, SessionState,
    },
    Config, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "posture-watch")]
#[command(version = VERSION)]
#[command(about = "Real-time posture monitoring from pose keypoints", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a monitoring session over a recorded keypoint stream
    Replay {
        /// JSON Lines recording, one frame per line
        file: PathBuf,

        /// Log tones instead of playing them
        #[arg(long)]
        no_audio: bool,

        /// Override the poor-posture dwell before an alert (ms)
        #[arg(long)]
        dwell_ms: Option<u64>,

        /// Configuration file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Classify a single keypoint set (JSON array)
    Classify {
        file: PathBuf,

        /// Configuration file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show configuration
    Config,

    /// Play the startup chime on the default output device
    #[cfg(feature = "audio")]
    Chime,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Replay {
            file,
            no_audio,
            dwell_ms,
            config,
        } => cmd_replay(&file, no_audio, dwell_ms, config.as_deref()).await,
        Commands::Classify { file, config } => cmd_classify(&file, config.as_deref()),
        Commands::Config => {
            cmd_config();
            Ok(())
        }
        #[cfg(feature = "audio")]
        Commands::Chime => cmd_chime(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "posture_watch=debug"
    } else {
        "posture_watch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Could not load configuration from {path:?}"))?,
        None => Config::load().unwrap_or_default(),
    };
    Ok(config)
}

async fn cmd_replay(
    file: &Path,
    no_audio: bool,
    dwell_ms: Option<u64>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dwell_ms) = dwell_ms {
        config.thresholds.dwell_ms = dwell_ms;
    }

    let recording =
        Recording::load(file).with_context(|| format!("Could not read recording {file:?}"))?;

    println!("Posture Watch v{VERSION}");
    println!();
    println!("Recording: {:?}", file);
    println!(
        "  Frames: {} over {:.1}s",
        recording.len(),
        recording.duration_ms() as f64 / 1000.0
    );
    println!("  Alert dwell: {}ms", config.thresholds.dwell_ms);
    println!();

    let start = Utc::now();
    let clock = Arc::new(ManualClock::new(start));
    let (camera, replay_engine) = recording.into_replay(start, Arc::clone(&clock));
    let session_clock: Arc<dyn Clock> = clock;

    let audio = open_audio(&config, Arc::clone(&session_clock), no_audio);
    let mut session = SessionController::with_audio(
        config,
        session_clock,
        audio,
        Box::new(ConsoleObserver::default()),
    );

    let stop = session.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("Error setting Ctrl+C handler")?;

    session.load_engine(engine::ready(replay_engine)).await?;
    session.start_camera(Box::new(camera))?;
    session.start_detection()?;

    let frames = session.run().await?;
    session.return_to_idle();

    println!();
    println!("Replayed {frames} frames");
    println!("{}", session.stats().summary());
    Ok(())
}

/// Pick the tone output for this run.
fn open_audio(config: &Config, clock: Arc<dyn Clock>, no_audio: bool) -> AudioFeedback {
    let cooldown_ms = config.thresholds.audio_cooldown_ms;

    #[cfg(feature = "audio")]
    if !no_audio {
        return match posture_watch::audio::RodioSink::open() {
            Ok(sink) => AudioFeedback::new(Box::new(sink), clock, cooldown_ms, config.audio_enabled),
            Err(e) => AudioFeedback::unavailable(clock, cooldown_ms, &e),
        };
    }

    #[cfg(not(feature = "audio"))]
    if !no_audio {
        tracing::debug!("Built without the audio feature; tones are logged");
    }

    AudioFeedback::new(Box::new(LogSink), clock, cooldown_ms, config.audio_enabled)
}

fn cmd_classify(file: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Could not read {file:?}"))?;
    let keypoints: KeypointSet =
        serde_json::from_str(&content).context("Expected a JSON array of keypoints")?;

    let metrics = extract_metrics(&keypoints, &config.thresholds)?;
    let readout = MetricsReadout::from_metrics(&metrics);
    let classification = classify(&metrics, &config.thresholds);

    println!("Shoulder angle:     {}", readout.shoulder_angle);
    println!("Forward head:       {}", readout.forward_head);
    println!(
        "Shoulder slouch:    {:.1}%",
        metrics.shoulder_slouch_ratio * 100.0
    );
    println!("Head offset:        {:.3}", metrics.head_forward_distance);
    println!();
    println!("{}", classification.status_text());
    println!("{}", classification.summary());
    Ok(())
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

#[cfg(feature = "audio")]
fn cmd_chime() -> anyhow::Result<()> {
    use posture_watch::audio::RodioSink;
    use posture_watch::core::SystemClock;

    let sink = RodioSink::open()?;
    let mut audio = AudioFeedback::new(Box::new(sink), Arc::new(SystemClock), 0, true);
    audio.play_startup_chime();

    // Playback happens on the output thread; keep the process alive for it.
    std::thread::sleep(std::time::Duration::from_millis(500));
    Ok(())
}

/// Prints session output to the terminal.
#[derive(Default)]
struct ConsoleObserver {
    last_status: Option<&'static str>,
}

impl PostureObserver for ConsoleObserver {
    fn on_status(&mut self, message: &str) {
        println!("[status] {message}");
    }

    fn on_state_changed(&mut self, _from: SessionState, to: SessionState) {
        if to == SessionState::Idle {
            self.last_status = None;
        }
    }

    fn on_readout(&mut self, readout: &MetricsReadout) {
        tracing::debug!(
            "Readout: shoulders {} forward head {}",
            readout.shoulder_angle,
            readout.forward_head
        );
    }

    fn on_verdict(&mut self, verdict: &PostureVerdict) {
        if self.last_status != Some(verdict.status) {
            println!("[{}] {}", verdict.status, verdict.summary);
            self.last_status = Some(verdict.status);
        }
    }

    fn on_alert_shown(&mut self, alert: &AlertEvent) {
        println!(
            "[alert #{}] Poor posture held too long: {}",
            alert.id,
            alert
                .issues
                .iter()
                .map(|issue| issue.label())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    fn on_alert_dismissed(&mut self, alert: &AlertEvent, reason: DismissReason) {
        println!("[alert #{}] closed ({:?})", alert.id, reason);
    }
}
