//! Configuration.
//!
//! YAML with precedence: CLI > file > defaults. Every field has a default,
//! so an empty file is a valid configuration.
//!
//! ```yaml
//! global:
//!   frame_rate: 60
//!   stats_interval_ms: 250
//!   process_interval_ms: 1250
//! cpu:
//!   glitch_floor: 0.02
//!   glitch_hold_ms: 400
//!   tau_up_ms: 250
//!   tau_down_ms: 800
//! thresholds:
//!   mem_panic: 0.93
//!   net_hyper_bps: 2000000
//! commentary:
//!   OK: "All quiet."
//! ```

use crate::error::{MonitorError, Result};
use crate::mood::{Commentary, Thresholds};
use crate::smoothing::SmoothingParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Loop cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Frames per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Metrics refresh interval in milliseconds.
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,

    /// Process scan interval in milliseconds.
    #[serde(default = "default_process_interval_ms")]
    pub process_interval_ms: u64,
}

fn default_frame_rate() -> u32 {
    60
}
fn default_stats_interval_ms() -> u64 {
    250
}
fn default_process_interval_ms() -> u64 {
    1250
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            stats_interval_ms: default_stats_interval_ms(),
            process_interval_ms: default_process_interval_ms(),
        }
    }
}

/// CPU display smoothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Readings below this may be a glitch.
    #[serde(default = "default_glitch_floor")]
    pub glitch_floor: f64,

    /// How long a dip below the floor is held, in milliseconds.
    #[serde(default = "default_glitch_hold_ms")]
    pub glitch_hold_ms: u64,

    /// Bar rise time constant in milliseconds.
    #[serde(default = "default_tau_up_ms")]
    pub tau_up_ms: u64,

    /// Bar fall time constant in milliseconds.
    #[serde(default = "default_tau_down_ms")]
    pub tau_down_ms: u64,
}

fn default_glitch_floor() -> f64 {
    0.02
}
fn default_glitch_hold_ms() -> u64 {
    400
}
fn default_tau_up_ms() -> u64 {
    250
}
fn default_tau_down_ms() -> u64 {
    800
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            glitch_floor: default_glitch_floor(),
            glitch_hold_ms: default_glitch_hold_ms(),
            tau_up_ms: default_tau_up_ms(),
            tau_down_ms: default_tau_down_ms(),
        }
    }
}

impl CpuConfig {
    /// Smoother tuning in seconds.
    #[must_use]
    pub fn smoothing_params(&self) -> SmoothingParams {
        let secs = |ms: u64| ms as f64 / 1000.0;
        SmoothingParams {
            glitch_floor: self.glitch_floor,
            glitch_hold: secs(self.glitch_hold_ms),
            tau_up: secs(self.tau_up_ms),
            tau_down: secs(self.tau_down_ms),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cadences.
    #[serde(default)]
    pub global: GlobalConfig,

    /// CPU smoothing.
    #[serde(default)]
    pub cpu: CpuConfig,

    /// Mood thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Per-mood commentary overrides.
    #[serde(default)]
    pub commentary: Commentary,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/purrtop/config.yaml`, if the platform has a config
    /// directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("purrtop").join("config.yaml"))
    }

    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| MonitorError::ConfigNotFound(path.display().to_string()))?;

        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map_or(0, |l| l.line());
            MonitorError::ConfigParse {
                line,
                message: e.to_string(),
            }
        })
    }

    /// Rejects values the frame loop cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ConfigInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(MonitorError::ConfigInvalid {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.global.frame_rate == 0 {
            return invalid("global.frame_rate", "must be at least 1");
        }
        if self.global.stats_interval_ms == 0 {
            return invalid("global.stats_interval_ms", "must be at least 1");
        }
        if self.global.process_interval_ms == 0 {
            return invalid("global.process_interval_ms", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.cpu.glitch_floor) {
            return invalid("cpu.glitch_floor", "must be between 0 and 1");
        }
        if self.thresholds.energy_net_full_bps <= 0.0 {
            return invalid("thresholds.energy_net_full_bps", "must be positive");
        }
        Ok(())
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Time between frames.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.global.frame_rate.max(1)))
    }

    /// Time between metric refreshes.
    #[must_use]
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.global.stats_interval_ms)
    }

    /// Time between process scans.
    #[must_use]
    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.global.process_interval_ms)
    }
}
