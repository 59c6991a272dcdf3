//! Plotter configuration, loaded once from TOML and passed to constructors.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete plotter configuration.
///
/// Every table is optional in the file; missing tables and keys fall back to
/// [`PlotterConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotterConfig {
    pub board: BoardConfig,
    pub motor: MotorConfig,
    pub left: ActuatorPins,
    pub right: ActuatorPins,
    pub motion: MotionConfig,
    pub network: NetworkConfig,
}

/// Drawable area; anchors sit at `(0, 0)` and `(width_mm, 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width_mm: 1200.0,
            height_mm: 900.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorConfig {
    pub steps_per_revolution: u32,
    pub microsteps: u32,
    pub spool_diameter_mm: f64,
    /// Explicit calibration; overrides the value derived from the spool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_per_mm: Option<f64>,
    /// Driver boards commonly enable on a low level.
    pub enable_active_low: bool,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            steps_per_revolution: 200,
            microsteps: 16,
            spool_diameter_mm: 20.0,
            steps_per_mm: None,
            enable_active_low: true,
        }
    }
}

/// Output pin numbers for one actuator. All three are required when the
/// table is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActuatorPins {
    pub step_pin: u8,
    pub dir_pin: u8,
    pub enable_pin: u8,
}

impl ActuatorPins {
    pub fn all(&self) -> [u8; 3] {
        [self.step_pin, self.dir_pin, self.enable_pin]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    /// Step rate of the longer-travel actuator, steps per second.
    pub max_speed: f64,
    pub path_pause_ms: u64,
    pub line_segments: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_speed: 2000.0,
            path_pause_ms: 50,
            line_segments: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            motor: MotorConfig::default(),
            left: ActuatorPins {
                step_pin: 14,
                dir_pin: 15,
                enable_pin: 18,
            },
            right: ActuatorPins {
                step_pin: 16,
                dir_pin: 20,
                enable_pin: 21,
            },
            motion: MotionConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl PlotterConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded plotter config");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (used by `wireplot serve --print-config`).
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Steps per millimeter of wire: the explicit override, or
    /// `steps_per_revolution * microsteps / (pi * spool_diameter_mm)`.
    pub fn steps_per_mm(&self) -> f64 {
        match self.motor.steps_per_mm {
            Some(value) => value,
            None => {
                let steps_per_rev =
                    f64::from(self.motor.steps_per_revolution) * f64::from(self.motor.microsteps);
                steps_per_rev / (std::f64::consts::PI * self.motor.spool_diameter_mm)
            }
        }
    }

    pub fn path_pause(&self) -> Duration {
        Duration::from_millis(self.motion.path_pause_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("board.width_mm", self.board.width_mm)?;
        positive("board.height_mm", self.board.height_mm)?;

        if self.motor.steps_per_revolution == 0 {
            return Err(invalid("motor.steps_per_revolution must be at least 1"));
        }
        if self.motor.microsteps == 0 {
            return Err(invalid("motor.microsteps must be at least 1"));
        }
        positive("motor.spool_diameter_mm", self.motor.spool_diameter_mm)?;
        if let Some(value) = self.motor.steps_per_mm {
            positive("motor.steps_per_mm", value)?;
        }

        positive("motion.max_speed", self.motion.max_speed)?;
        if self.motion.line_segments == 0 {
            return Err(invalid("motion.line_segments must be at least 1"));
        }

        let mut seen: BTreeMap<u8, &'static str> = BTreeMap::new();
        let assignments = [
            ("left.step_pin", self.left.step_pin),
            ("left.dir_pin", self.left.dir_pin),
            ("left.enable_pin", self.left.enable_pin),
            ("right.step_pin", self.right.step_pin),
            ("right.dir_pin", self.right.dir_pin),
            ("right.enable_pin", self.right.enable_pin),
        ];
        for (name, pin) in assignments {
            if let Some(previous) = seen.insert(pin, name) {
                return Err(invalid(format!(
                    "pin {pin} assigned to both {previous} and {name}"
                )));
            }
        }

        if self.network.bind.trim().is_empty() {
            return Err(invalid("network.bind must not be empty"));
        }

        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be a positive number, got {value}")))
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        PlotterConfig::default().validate().unwrap();
    }

    #[test]
    fn derived_steps_per_mm() {
        let cfg = PlotterConfig::default();
        let expected = 3200.0 / (std::f64::consts::PI * 20.0);
        assert!((cfg.steps_per_mm() - expected).abs() < 1e-9);
    }

    #[test]
    fn override_steps_per_mm() {
        let cfg = PlotterConfig::from_toml_str("[motor]\nsteps_per_mm = 2.0\n").unwrap();
        assert_eq!(cfg.steps_per_mm(), 2.0);
        assert_eq!(cfg.motor.microsteps, 16);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = PlotterConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PlotterConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let cfg = PlotterConfig::from_toml_str(
            r#"
            [board]
            width_mm = 800.0

            [network]
            bind = "127.0.0.1:6000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.board.width_mm, 800.0);
        assert_eq!(cfg.board.height_mm, 900.0);
        assert_eq!(cfg.network.bind, "127.0.0.1:6000");
        assert_eq!(cfg.left.step_pin, 14);
    }

    #[test]
    fn unknown_key_rejected() {
        let err = PlotterConfig::from_toml_str("[board]\ndepth_mm = 3.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn duplicate_pins_rejected() {
        let err = PlotterConfig::from_toml_str(
            "[right]\nstep_pin = 14\ndir_pin = 20\nenable_pin = 21\n",
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid(msg) => {
                assert!(msg.contains("left.step_pin"));
                assert!(msg.contains("right.step_pin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_positive_values_rejected() {
        for text in [
            "[board]\nwidth_mm = 0.0\n",
            "[board]\nheight_mm = -5.0\n",
            "[motor]\nmicrosteps = 0\n",
            "[motor]\nspool_diameter_mm = nan\n",
            "[motion]\nmax_speed = 0.0\n",
            "[motion]\nline_segments = 0\n",
        ] {
            let err = PlotterConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{text}");
        }
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = PlotterConfig::default();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(PlotterConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = PlotterConfig::load("/nonexistent/wireplot.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_from_disk() {
        let path = std::env::temp_dir().join(format!("wireplot-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[motion]\nmax_speed = 500.0\n").unwrap();
        let cfg = PlotterConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.motion.max_speed, 500.0);
    }
}
