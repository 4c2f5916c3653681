use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::app_dirs::AppDirs;

/// Immutable parameters of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    /// misses allowed before the session ends
    pub max_misses: u32,
    pub num_cells: usize,
    /// delay before the first miss, in milliseconds
    pub initial_delay_ms: u64,
    /// floor of the difficulty ramp, in milliseconds
    pub min_delay_ms: u64,
    /// how much each hit or miss shortens the delay, in milliseconds
    pub delay_step_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_misses: 5,
            num_cells: 9,
            initial_delay_ms: 2000,
            min_delay_ms: 500,
            delay_step_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max misses must be greater than 0")]
    ZeroMaxMisses,
    #[error("at least 2 cells are required, got {0}")]
    TooFewCells(usize),
    #[error("initial delay must be greater than 0ms")]
    ZeroInitialDelay,
    #[error("minimum delay must be greater than 0ms")]
    ZeroMinDelay,
    #[error("minimum delay ({min}ms) must not exceed initial delay ({initial}ms)")]
    MinDelayAboveInitial { min: u64, initial: u64 },
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_misses == 0 {
            return Err(ConfigError::ZeroMaxMisses);
        }
        if self.num_cells < 2 {
            return Err(ConfigError::TooFewCells(self.num_cells));
        }
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::ZeroInitialDelay);
        }
        if self.min_delay_ms == 0 {
            return Err(ConfigError::ZeroMinDelay);
        }
        if self.min_delay_ms > self.initial_delay_ms {
            return Err(ConfigError::MinDelayAboveInitial {
                min: self.min_delay_ms,
                initial: self.initial_delay_ms,
            });
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("whack_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> GameConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            return GameConfig::default();
        };
        match serde_json::from_slice::<GameConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("ignoring malformed config {}: {}", self.path.display(), e);
                GameConfig::default()
            }
        }
    }

    fn save(&self, cfg: &GameConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
