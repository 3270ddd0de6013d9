//! Configuration file handling for tapmeter.
//!
//! Loads configuration from `~/.config/tapmeter/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{BatchPolicy, DEFAULT_CAPACITY, DEFAULT_PAUSE};
use crate::display::{DisplayDescriptor, Rect, Size, StaticDisplaySource};
use crate::motion::MIN_SAMPLE_DISTANCE_POINTS;

/// Default config file written by `tapmeter config init`.
pub const DEFAULT_CONFIG: &str = r#"# tapmeter configuration

# Keyboard layout identifier stamped on every action record
# keyboard_layout = "com.apple.keylayout.US"

[batch]
# Maximum number of movement samples in one stroke
capacity = 512
# Movement steps shorter than this (in points) are not recorded
min_distance_points = 5.0
# A pause longer than this (in milliseconds) ends a stroke
pause_ms = 500

[displays]
# How often to check for display configuration changes (seconds)
poll_interval_secs = 2
# Pixel density used to estimate physical size when the OS doesn't report it
fallback_dpi = 110.0

# Declare displays by hand instead of querying the OS:
# [[displays.manual]]
# x = 0.0
# y = 0.0
# width = 1470.0
# height = 956.0
# width_mm = 302.0
# height_mm = 196.0
# width_px = 2940
# height_px = 1912
# main = true
# builtin = true

[output]
# Write records to a file instead of stdout
# path = "tapmeter.jsonl"
"#;

/// Configuration file structure for tapmeter.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub keyboard_layout: Option<String>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub displays: DisplaysConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_min_distance")]
    pub min_distance_points: f64,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            capacity: default_capacity(),
            min_distance_points: default_min_distance(),
            pause_ms: default_pause_ms(),
        }
    }
}

impl BatchConfig {
    pub fn policy(&self) -> BatchPolicy {
        BatchPolicy {
            capacity: self.capacity,
            min_distance_points: self.min_distance_points,
            max_deviation: FRAC_PI_2,
            pause: Duration::from_millis(self.pause_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DisplaysConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_dpi")]
    pub fallback_dpi: f64,
    #[serde(default)]
    pub manual: Vec<ManualDisplay>,
}

impl Default for DisplaysConfig {
    fn default() -> Self {
        DisplaysConfig {
            poll_interval_secs: default_poll_interval(),
            fallback_dpi: default_dpi(),
            manual: Vec::new(),
        }
    }
}

impl DisplaysConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// A display source for the manually declared displays, if any.
    pub fn manual_source(&self) -> Option<StaticDisplaySource> {
        if self.manual.is_empty() {
            return None;
        }
        Some(StaticDisplaySource::new(
            self.manual
                .iter()
                .enumerate()
                .map(|(i, d)| d.descriptor(i as u32))
                .collect(),
        ))
    }
}

/// A display declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ManualDisplay {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    /// Physical resolution; defaults to the point size
    pub width_px: Option<u32>,
    pub height_px: Option<u32>,
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub builtin: bool,
}

impl ManualDisplay {
    fn descriptor(&self, id: u32) -> DisplayDescriptor {
        let fallback_px = match (self.width_px, self.height_px) {
            (Some(w), Some(h)) => Size::new(w as f64, h as f64),
            _ => Size::new(self.width, self.height),
        };
        DisplayDescriptor {
            id,
            bounds: Rect::new(self.x, self.y, self.width, self.height),
            size_mm: Size::new(self.width_mm, self.height_mm),
            modes: Vec::new(),
            fallback_px,
            is_main: self.main,
            is_builtin: self.builtin,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_min_distance() -> f64 {
    MIN_SAMPLE_DISTANCE_POINTS
}

fn default_pause_ms() -> u64 {
    DEFAULT_PAUSE.as_millis() as u64
}

fn default_poll_interval() -> u64 {
    2
}

fn default_dpi() -> f64 {
    110.0
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Check value ranges that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.capacity == 0 {
            return Err(ConfigError::Invalid(
                "batch.capacity must be at least 1".to_string(),
            ));
        }
        let min = self.batch.min_distance_points;
        if min.is_nan() || min < 0.0 {
            return Err(ConfigError::Invalid(
                "batch.min_distance_points must not be negative".to_string(),
            ));
        }
        if self.displays.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "displays.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        for (i, d) in self.displays.manual.iter().enumerate() {
            if d.width <= 0.0 || d.height <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "displays.manual[{}] must have a positive width and height",
                    i
                )));
            }
        }
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tapmeter").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/tapmeter/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = Config::default();
        let policy = config.batch.policy();
        assert_eq!(policy, BatchPolicy::default());
        assert_eq!(config.displays.poll_interval(), Duration::from_secs(2));
        assert!(config.displays.manual_source().is_none());
        assert!(config.output.path.is_none());
    }

    #[test]
    fn test_default_config_text_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str("[batch]\ncapacity = 64\n").unwrap();
        assert_eq!(config.batch.capacity, 64);
        assert_eq!(config.batch.pause_ms, 500);
        assert_eq!(config.batch.min_distance_points, 5.0);
    }

    #[test]
    fn test_manual_displays() {
        let config: Config = toml::from_str(
            r#"
            [[displays.manual]]
            width = 1470.0
            height = 956.0
            width_mm = 302.0
            height_mm = 196.0
            width_px = 2940
            height_px = 1912
            main = true

            [[displays.manual]]
            x = 1470.0
            width = 1920.0
            height = 1080.0
            width_mm = 527.0
            height_mm = 296.0
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        let source = config.displays.manual_source().unwrap();
        let descriptors = crate::display::DisplaySource::active_displays(&source).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].fallback_px, Size::new(2940.0, 1912.0));
        assert!(descriptors[0].is_main);
        assert_eq!(descriptors[1].id, 1);
        assert_eq!(descriptors[1].bounds.origin.x, 1470.0);
        assert_eq!(descriptors[1].fallback_px, Size::new(1920.0, 1080.0));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.batch.capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch.capacity"));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.displays.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_path();
        assert!(path.ends_with("tapmeter/config.toml"));
    }
}
