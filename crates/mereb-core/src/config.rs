//! Configuration management for mereb.
//!
//! Loads configuration from ${MEREB_HOME}/config.toml with sensible defaults.
//! Endpoint URLs can be overridden per process with `MEREB_*_URL` variables.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Env var overriding [`EndpointsConfig::users_url`].
pub const USERS_URL_ENV: &str = "MEREB_USERS_URL";
/// Env var overriding [`EndpointsConfig::posts_url`].
pub const POSTS_URL_ENV: &str = "MEREB_POSTS_URL";
/// Env var overriding [`EndpointsConfig::control_url`].
pub const CONTROL_URL_ENV: &str = "MEREB_CONTROL_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for mereb configuration and data directories.
    //!
    //! MEREB_HOME resolution order:
    //! 1. MEREB_HOME environment variable (if set)
    //! 2. ~/.config/mereb (default)

    use std::path::PathBuf;

    /// Returns the mereb home directory.
    ///
    /// Checks MEREB_HOME env var first, falls back to ~/.config/mereb
    pub fn mereb_home() -> PathBuf {
        if let Ok(home) = std::env::var("MEREB_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".mereb"),
            |h| h.join(".config").join("mereb"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        mereb_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        mereb_home().join("session.json")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        mereb_home().join("logs")
    }
}

/// Backend base URLs.
///
/// The three backends are separate services, so each has its own base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// User service (`/login`, `/register`, `/{username}`)
    pub users_url: String,
    /// Post service (`/`, `/{id}`)
    pub posts_url: String,
    /// Docker control backend
    pub control_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            users_url: "http://localhost:8082/api/users".to_string(),
            posts_url: "http://localhost:8083/api/posts".to_string(),
            control_url: "http://localhost:5000".to_string(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds (0 disables)
    pub timeout_secs: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    const DEFAULT_TIMEOUT_SECS: u32 = 30;

    /// Loads configuration from the default config path and applies env
    /// overrides.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Replaces endpoint URLs with non-empty values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = pick(USERS_URL_ENV) {
            self.endpoints.users_url = url;
        }
        if let Some(url) = pick(POSTS_URL_ENV) {
            self.endpoints.posts_url = url;
        }
        if let Some(url) = pick(CONTROL_URL_ENV) {
            self.endpoints.control_url = url;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.http.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.http.timeout_secs)))
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
