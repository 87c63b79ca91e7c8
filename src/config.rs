//! Configuration for posture-watch.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Classification, dwell and cooldown limits
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Whether tone feedback starts enabled
    #[serde(default = "default_audio_enabled")]
    pub audio_enabled: bool,

    /// How long an alert stays visible if the user does not dismiss it
    #[serde(with = "duration_ms_serde", default = "default_alert_auto_dismiss")]
    pub alert_auto_dismiss: Duration,
}

fn default_audio_enabled() -> bool {
    true
}

fn default_alert_auto_dismiss() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            audio_enabled: default_audio_enabled(),
            alert_auto_dismiss: default_alert_auto_dismiss(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("posture-watch")
            .join("config.json")
    }
}

/// Limits used to judge posture and pace feedback.
///
/// Fixed for the lifetime of a session. Every field is public so callers
/// (and tests) can override individual limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Shoulder tilt that is a problem on its own (degrees)
    pub severe_shoulder_tilt_deg: f64,
    /// Shoulder tilt tolerated unless combined with another issue (degrees)
    pub good_shoulder_angle_deg: f64,
    /// Maximum acceptable forward head ratio
    pub forward_head_ratio: f64,
    /// Maximum acceptable slouch ratio
    pub shoulder_slouch_ratio: f64,
    /// Maximum horizontal head offset in normalized units
    pub head_forward_abs_distance: f64,
    /// Normal vertical ear-to-shoulder gap in normalized units
    pub expected_ear_shoulder_ratio: f64,
    /// Continuous poor posture required before an alert (ms)
    pub dwell_ms: u64,
    /// Minimum gap between two tones (ms)
    pub audio_cooldown_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            severe_shoulder_tilt_deg: 15.0,
            good_shoulder_angle_deg: 12.0,
            forward_head_ratio: 0.06,
            shoulder_slouch_ratio: 0.04,
            head_forward_abs_distance: 0.08,
            expected_ear_shoulder_ratio: 0.15,
            dwell_ms: 2000,
            audio_cooldown_ms: 100,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
