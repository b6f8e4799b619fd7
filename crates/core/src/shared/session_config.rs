use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_BUCKET_SIZE, DEFAULT_LATENCY_WINDOW, DEFAULT_MAX_CONFIDENCE, DEFAULT_MIN_CONFIDENCE,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables fixed for the lifetime of a detection session.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Identity bucket side length in pixels.
    pub bucket_size: u32,
    /// Number of recent frame durations averaged for latency.
    pub latency_window: usize,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Pace the run loop to this rate; `None` runs as fast as frames arrive.
    pub target_fps: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            latency_window: DEFAULT_LATENCY_WINDOW,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_confidence: DEFAULT_MAX_CONFIDENCE,
            target_fps: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_size == 0 {
            return Err(ConfigError::Invalid("bucket_size must be >= 1".into()));
        }
        if self.latency_window == 0 {
            return Err(ConfigError::Invalid("latency_window must be >= 1".into()));
        }
        let confidence_ok = (0.0..=1.0).contains(&self.min_confidence)
            && (0.0..=1.0).contains(&self.max_confidence)
            && self.min_confidence <= self.max_confidence;
        if !confidence_ok {
            return Err(ConfigError::Invalid(format!(
                "confidence range must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                self.min_confidence, self.max_confidence
            )));
        }
        if let Some(fps) = self.target_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "target_fps must be positive, got {fps}"
                )));
            }
        }
        Ok(())
    }
}
