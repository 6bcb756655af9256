//! Persistent timer configuration model and file-backed manager.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

const CONFIG_FILE: &str = "config.json";

/// Resolves the platform-specific directory holding `config.json` and the credential store.
pub fn default_config_dir() -> AppResult<PathBuf> {
    directories::ProjectDirs::from("com", "jira-timer", "jira-timer")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(AppError::ConfigDir)
}

/// Timing and autocomplete settings. Every field falls back to its default when absent from the file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub tick_interval_ms: u64,
    pub notification_duration_ms: u64,
    pub autocomplete_debounce_ms: u64,
    pub autocomplete_min_chars: usize,
    pub autocomplete_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            notification_duration_ms: 2000,
            autocomplete_debounce_ms: 500,
            autocomplete_min_chars: 3,
            autocomplete_limit: 10,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Clamps values that would stall the tick loop or the HTTP client.
    pub fn normalized(mut self) -> Self {
        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = 1;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 1;
        }
        if self.autocomplete_limit == 0 {
            self.autocomplete_limit = 1;
        }
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }

    pub fn autocomplete_debounce(&self) -> Duration {
        Duration::from_millis(self.autocomplete_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Loads and saves `config.json` inside the config directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(CONFIG_FILE),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads config from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Config {
        let config = if self.path.exists() {
            match fs::read_to_string(&self.path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                    log::warn!("Ignoring malformed {}: {}", self.path.display(), err);
                    Config::default()
                }),
                Err(err) => {
                    log::warn!("Failed to read {}: {}", self.path.display(), err);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };
        config.normalized()
    }

    /// Persists config to disk, creating parent directories when needed.
    pub fn save(&self, config: &Config) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
