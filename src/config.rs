use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const APP_DIR: &str = "study-hub";
const CONFIG_FILE: &str = "config.toml";

pub const ENV_DATA_DIR: &str = "STUDYHUB_DATA_DIR";
pub const ENV_API_BASE: &str = "STUDYHUB_API_BASE";
pub const ENV_NOTIFY_BASE: &str = "STUDYHUB_NOTIFY_BASE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine a config directory for this platform")]
    NoConfigDir,
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Where local JSON data, backups and logs live. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Base URL of a remote backend. Empty means local storage.
    #[serde(default)]
    pub api_base: String,
    /// Base URL for notification hooks. Empty disables them.
    #[serde(default)]
    pub notify_base: String,
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(APP_DIR)
            .join(CONFIG_FILE))
    }

    /// Loads the config file (defaults if missing) and applies env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Non-empty values from `lookup` replace the file values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(base) = non_empty(ENV_API_BASE) {
            self.api_base = base;
        }
        if let Some(base) = non_empty(ENV_NOTIFY_BASE) {
            self.notify_base = base;
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        Ok(dirs::data_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(APP_DIR))
    }

    pub fn api_base(&self) -> Option<&str> {
        Some(self.api_base.trim()).filter(|base| !base.is_empty())
    }

    pub fn notify_base(&self) -> Option<&str> {
        Some(self.notify_base.trim()).filter(|base| !base.is_empty())
    }
}
