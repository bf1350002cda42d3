//! Console configuration.
//!
//! Loaded from `~/.qdr-console/console.toml` unless a path is given. Every
//! field has a default, so a missing file or a partial file is valid.

use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5_000;
/// Prevents a zero interval from turning the refresh loop into a busy loop.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 100;

const CONFIG_DIR: &str = ".qdr-console";
const CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_show_logs")]
    pub show_logs: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { show_logs: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub tree: TreeConfig,
}

impl ConsoleConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(
            self.polling
                .refresh_interval_ms
                .max(MIN_REFRESH_INTERVAL_MS),
        )
    }
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_show_logs() -> bool {
    true
}

/// Returns `~/.qdr-console/console.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(ConsoleError::HomeDirNotFound)?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Loads the console configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: Option<PathBuf>) -> Result<ConsoleConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(ConsoleConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|source| ConsoleError::Io {
        context: format!("reading console config {}", config_path.display()),
        source,
    })?;
    toml::from_str::<ConsoleConfig>(&content).map_err(|err| ConsoleError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}
