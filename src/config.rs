// Topics, timing and tuning constants for the teleop runtime
//
// Everything tunable lives in `Config`, fixed at startup. Topic names stay
// compile-time constants shared with the bridges.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::{ButtonMap, HapticPulse};
use crate::motor::soft_limit::JointLimits;

// Zenoh topics
pub const TOPIC_GAMEPAD: &str = "clawbot/input/gamepad"; // controller snapshots
pub const TOPIC_TILT: &str = "clawbot/input/tilt"; // hub IMU roll
pub const TOPIC_JOINT: &str = "clawbot/state/joint"; // joint angle readings
pub const TOPIC_RT_MOTORS: &str = "clawbot/rt/motors"; // actuation
pub const TOPIC_HAPTIC: &str = "clawbot/feedback/haptic"; // rumble requests
pub const TOPIC_HEALTH: &str = "clawbot/state/health"; // health status
pub const TOPIC_WRIST: &str = "clawbot/state/wrist"; // wrist angle + limits report

// How long the runtime listens for joint readings before deciding which actuators exist
pub const PROBE_WINDOW: Duration = Duration::from_millis(500);

/// What an unlimited joint does when no button drives it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    Brake,
    Coast,
}

/// Optional actuators the robot is expected to carry on its fourth port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionalActuators {
    pub wrist: bool,
    pub auxiliary: bool,
}

impl Default for OptionalActuators {
    fn default() -> Self {
        Self {
            wrist: true,
            auxiliary: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Process-wide teleop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control loop period. Shorter periods react faster but cost more driver calls.
    pub tick_interval_ms: u64,
    /// Gamepad watchdog: older snapshots are replaced by the neutral one
    pub input_timeout_ms: u64,

    pub deadzone: f32,
    pub speed_min: f32,
    pub speed_max: f32,

    pub drive_scale: f32,
    pub claw_scale: f32,
    pub wrist_speed: f32,
    pub aux_speed: f32,
    pub aux_stop: StopPolicy,

    pub flip_threshold_deg: f32,
    pub flip_hysteresis_deg: f32,
    /// Swap wrist buttons while flipped so they keep their physical meaning
    pub mirror_wrist_when_flipped: bool,

    /// Factory wrist limits, also the target of a limit reset
    pub wrist_limits: JointLimits,

    pub actuators: OptionalActuators,
    pub buttons: ButtonMap,

    pub startup_pulse: HapticPulse,
    pub limit_alert: HapticPulse,
    /// Rumble only on the first tick of a refusal instead of on every refused tick
    pub limit_alert_on_onset_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
            input_timeout_ms: 250,
            deadzone: 0.01,
            speed_min: -100.0,
            speed_max: 100.0,
            drive_scale: 1.0,
            claw_scale: 1.0,
            wrist_speed: 100.0,
            aux_speed: 100.0,
            aux_stop: StopPolicy::Brake,
            flip_threshold_deg: 90.0,
            flip_hysteresis_deg: 0.0,
            mirror_wrist_when_flipped: true,
            wrist_limits: JointLimits::new(-2000.0, 2000.0),
            actuators: OptionalActuators::default(),
            buttons: ButtonMap::default(),
            startup_pulse: HapticPulse::new(100, 200, 2, 100),
            limit_alert: HapticPulse::new(100, 100, 1, 200),
            limit_alert_on_onset_only: false,
        }
    }
}

impl Config {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".into()));
        }
        if !self.deadzone.is_finite() || self.deadzone < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "deadzone must be finite and >= 0, got {}",
                self.deadzone
            )));
        }
        if !(self.speed_min <= self.speed_max) {
            return Err(ConfigError::Invalid(format!(
                "speed_min {} exceeds speed_max {}",
                self.speed_min, self.speed_max
            )));
        }
        if !(self.flip_hysteresis_deg >= 0.0 && self.flip_hysteresis_deg < self.flip_threshold_deg)
        {
            return Err(ConfigError::Invalid(format!(
                "flip_hysteresis_deg must be in [0, {})",
                self.flip_threshold_deg
            )));
        }
        if !self.wrist_limits.is_ordered() {
            return Err(ConfigError::Invalid(format!(
                "wrist_limits lower {} exceeds upper {}",
                self.wrist_limits.lower, self.wrist_limits.upper
            )));
        }
        if self.actuators.wrist && self.actuators.auxiliary {
            if let Some(button) = self.buttons.shared_joint_button() {
                return Err(ConfigError::Invalid(format!(
                    "button {:?} is bound to both the wrist and the auxiliary joint",
                    button
                )));
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Button;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"tick_interval_ms": 5, "actuators": {"auxiliary": true}}"#)
                .unwrap();
        assert_eq!(config.tick_interval_ms, 5);
        assert!(config.actuators.wrist);
        assert!(config.actuators.auxiliary);
        assert_eq!(config.wrist_limits, JointLimits::new(-2000.0, 2000.0));
    }

    #[test]
    fn test_rejects_inverted_speed_bounds() {
        let config = Config {
            speed_min: 10.0,
            speed_max: -10.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_inverted_wrist_limits() {
        let config = Config {
            wrist_limits: JointLimits::new(100.0, -100.0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_tick() {
        let config = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_shared_joint_buttons_when_both_fitted() {
        let mut config = Config {
            actuators: OptionalActuators {
                wrist: true,
                auxiliary: true,
            },
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        config.buttons.aux_reverse = Button::Rb;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        // Only one joint fitted: sharing is harmless
        config.actuators.auxiliary = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/nonexistent/clawbot.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
