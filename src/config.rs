//! Engine configuration.
//!
//! Values come from `Default`, from `LIGHTNING_FRAME_*` environment variables
//! or from a JSON document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1_000_000;
pub const DEFAULT_JOIN_SUFFIX: &str = "_right";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub enabled: bool,
    /// Minimum row count before workers are used.
    pub threshold_rows: usize,
    pub workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_rows: DEFAULT_PARALLEL_THRESHOLD,
            workers: rayon::current_num_threads(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinDefaults {
    /// Appended to right-hand column names that clash with left-hand ones.
    pub suffix: String,
}

impl Default for JoinDefaults {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_JOIN_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub parallel: ParallelConfig,
    pub join: JoinDefaults,
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

impl FrameConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(flag) = std::env::var("LIGHTNING_FRAME_PARALLEL") {
            config.parallel.enabled = match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(Error::Config(format!(
                        "LIGHTNING_FRAME_PARALLEL must be a boolean, got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(threshold) = env_usize("LIGHTNING_FRAME_PARALLEL_THRESHOLD")? {
            config.parallel.threshold_rows = threshold;
        }
        if let Some(workers) = env_usize("LIGHTNING_FRAME_WORKERS")? {
            config.parallel.workers = workers;
        }
        if let Ok(suffix) = std::env::var("LIGHTNING_FRAME_JOIN_SUFFIX") {
            config.join.suffix = suffix;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot serialize configuration: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallel.workers == 0 {
            return Err(Error::Config("parallel.workers must be greater than 0".to_string()));
        }
        if self.join.suffix.is_empty() {
            return Err(Error::Config("join.suffix must not be empty".to_string()));
        }
        Ok(())
    }
}
