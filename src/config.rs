use crate::source::SampleEncoding;
use crate::waterfall::{DECIMATION, MIN_WIDTH};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("block size must be at least 2 samples, got {0}")]
    BlockSize(usize),
    #[error("window width {0} leaves no room for the spectrum region")]
    Width(usize),
    #[error("invalid dB range: min_db={min_db}, max_db={max_db}")]
    DbRange { min_db: f32, max_db: f32 },
    #[error("decimation factor must be at least 1")]
    Decimation,
    #[error("baud rate must be non-zero")]
    BaudRate,
    #[error("read timeout must be non-zero")]
    Timeout,
    #[error("sample rate must be a positive number of Hz, got {0}")]
    SampleRate(f32),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Serial line rate. The board sends 8N1 frames, so bytes arrive at baud / 10.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Upper bound on a single blocking read
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Samples per analysis block (N)
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Sample rate in Hz. Derived from the baud rate when unset.
    #[serde(default)]
    pub sample_rate: Option<f32>,

    /// Window width in pixels, including the separator and histogram
    #[serde(default = "default_width")]
    pub width: usize,

    #[serde(default = "default_min_db")]
    pub min_db: f32,

    #[serde(default = "default_max_db")]
    pub max_db: f32,

    /// Blocks read per scroll step
    #[serde(default = "default_decimation")]
    pub decimation: usize,

    #[serde(default)]
    pub encoding: SampleEncoding,

    #[serde(default = "default_remove_dc")]
    pub remove_dc: bool,

    /// Where snapshots go. Falls back to the local data directory.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_baud_rate() -> u32 {
    1_000_000
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_block_size() -> usize {
    1024
}

fn default_width() -> usize {
    1300
}

fn default_max_db() -> f32 {
    40.0
}

fn default_min_db() -> f32 {
    default_max_db() - 20.0
}

fn default_decimation() -> usize {
    DECIMATION
}

fn default_remove_dc() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            block_size: default_block_size(),
            sample_rate: None,
            width: default_width(),
            min_db: default_min_db(),
            max_db: default_max_db(),
            decimation: default_decimation(),
            encoding: SampleEncoding::default(),
            remove_dc: default_remove_dc(),
            snapshot_dir: None,
        }
    }
}

impl Settings {
    /// Load config from ~/.config/waterfall/config.toml
    /// Returns default settings if the file doesn't exist or fails to parse
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            tracing::info!("[config] could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "[config] no config file found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!("[config] loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("[config] {e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Write the current settings to ~/.config/waterfall/config.toml
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let Some(path) = config_path() else {
            anyhow::bail!("Could not determine config directory");
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;
        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("[config] saved settings to {}", path.display());
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size < 2 {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        if self.width < MIN_WIDTH {
            return Err(ConfigError::Width(self.width));
        }
        if !self.min_db.is_finite() || !self.max_db.is_finite() || self.min_db >= self.max_db {
            return Err(ConfigError::DbRange {
                min_db: self.min_db,
                max_db: self.max_db,
            });
        }
        if self.decimation == 0 {
            return Err(ConfigError::Decimation);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::BaudRate);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Timeout);
        }
        if let Some(rate) = self.sample_rate.filter(|&r| !(r.is_finite() && r > 0.0)) {
            return Err(ConfigError::SampleRate(rate));
        }
        Ok(())
    }

    /// Number of spectrum bins, which is also the framebuffer height
    pub fn height(&self) -> usize {
        self.block_size / 2 + 1
    }

    pub fn effective_sample_rate(&self) -> f32 {
        self.sample_rate.unwrap_or(self.baud_rate as f32 / 10.0)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn snapshot_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.snapshot_dir {
            return Ok(dir.clone());
        }

        let data_dir = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .data_local_dir()
            .join("waterfall")
            .join("snapshots");

        Ok(data_dir)
    }
}

/// Get the path to the config file: ~/.config/waterfall/config.toml
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "waterfall").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("waterfall-config-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.height(), 513);
        assert_eq!(settings.min_db, 20.0);
        assert_eq!(settings.max_db, 40.0);
        assert_eq!(settings.decimation, 340);
        assert_eq!(settings.effective_sample_rate(), 100_000.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial.toml");
        fs::write(&path, "width = 800\nencoding = \"offset-unsigned\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.width, 800);
        assert_eq!(settings.encoding, SampleEncoding::OffsetUnsigned);
        assert_eq!(settings.block_size, 1024);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = Settings {
            sample_rate: Some(48_000.0),
            snapshot_dir: Some(PathBuf::from("/tmp/shots")),
            ..Settings::default()
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let path = temp_path("broken.toml");
        fs::write(&path, "width = \"wide\"").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Parse(_))
        ));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = Settings {
            min_db: 40.0,
            max_db: 20.0,
            ..Settings::default()
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::DbRange { .. })));

        let narrow = Settings {
            width: 100,
            ..Settings::default()
        };
        assert!(matches!(narrow.validate(), Err(ConfigError::Width(100))));

        let no_decimation = Settings {
            decimation: 0,
            ..Settings::default()
        };
        assert!(matches!(no_decimation.validate(), Err(ConfigError::Decimation)));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let settings = Settings {
            timeout_ms: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Timeout)));
    }

    #[test]
    fn test_validate_rejects_bad_sample_rate() {
        for rate in [0.0, -48_000.0, f32::INFINITY, f32::NAN] {
            let settings = Settings {
                sample_rate: Some(rate),
                ..Settings::default()
            };
            assert!(
                matches!(settings.validate(), Err(ConfigError::SampleRate(_))),
                "rate {rate} accepted"
            );
        }

        let explicit = Settings {
            sample_rate: Some(48_000.0),
            ..Settings::default()
        };
        explicit.validate().unwrap();
    }
}
