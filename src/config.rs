//! Configuration management for seefood
//!
//! Handles loading and saving configuration from ~/.config/seefood/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::share::{DEFAULT_TTL_SECS, MAX_TTL_SECS};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application name for config directory
const APP_NAME: &str = "seefood";

/// Default port for the web server
pub const DEFAULT_PORT: u16 = 3000;

/// Default largest accepted request body (10 MiB); photos arrive as data URLs.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Keys accepted by `seefood config set/unset`.
pub const CONFIG_KEYS: [&str; 5] = [
    "default_port",
    "host",
    "public_url",
    "ttl_secs",
    "max_body_bytes",
];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default port for the web server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port: Option<u16>,

    /// Address to bind (defaults to 127.0.0.1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<IpAddr>,

    /// Externally visible base URL used to build share links,
    /// e.g. https://hotdogdetector.com
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// How long a share stays viewable, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    /// Largest accepted request body in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path
    ///
    /// Returns ~/.config/seefood/config.toml on Linux
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Get the config directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    ///
    /// Creates the parent directory if it doesn't exist
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check if any configuration is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set a value by key name, parsing it for the key's type
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "default_port" => self.default_port = Some(value.parse().map_err(|_| invalid())?),
            "host" => self.host = Some(value.parse().map_err(|_| invalid())?),
            "public_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid());
                }
                self.public_url = Some(value.trim_end_matches('/').to_string());
            }
            "ttl_secs" => {
                let ttl: u64 = value.parse().map_err(|_| invalid())?;
                if ttl == 0 || ttl > MAX_TTL_SECS {
                    return Err(invalid());
                }
                self.ttl_secs = Some(ttl);
            }
            "max_body_bytes" => self.max_body_bytes = Some(value.parse().map_err(|_| invalid())?),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Clear a value by key name
    pub fn unset(&mut self, key: &str) -> ConfigResult<()> {
        match key {
            "default_port" => self.default_port = None,
            "host" => self.host = None,
            "public_url" => self.public_url = None,
            "ttl_secs" => self.ttl_secs = None,
            "max_body_bytes" => self.max_body_bytes = None,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Get effective port (CLI, then config, then default)
    pub fn effective_port(&self, cli_port: Option<u16>) -> u16 {
        cli_port.or(self.default_port).unwrap_or(DEFAULT_PORT)
    }

    /// Get effective bind address
    pub fn effective_host(&self, cli_host: Option<IpAddr>) -> IpAddr {
        cli_host
            .or(self.host)
            .unwrap_or(IpAddr::from([127, 0, 0, 1]))
    }

    /// Get effective share time-to-live in seconds
    ///
    /// Values outside `1..=MAX_TTL_SECS` (e.g. from a hand-edited file) fall
    /// back to the default.
    pub fn effective_ttl_secs(&self, cli_ttl: Option<u64>) -> u64 {
        cli_ttl
            .or(self.ttl_secs)
            .filter(|ttl| (1..=MAX_TTL_SECS).contains(ttl))
            .unwrap_or(DEFAULT_TTL_SECS)
    }

    /// Get effective public base URL, if any
    pub fn effective_public_url(&self, cli_url: Option<String>) -> Option<String> {
        cli_url
            .or_else(|| self.public_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Get effective request body limit
    pub fn effective_max_body_bytes(&self) -> usize {
        self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }
}

/// Format the configuration for display
pub fn format_config(config: &Config) -> String {
    let mut lines = Vec::new();

    lines.push("Current configuration:".to_string());
    lines.push(String::new());

    match config.default_port {
        Some(port) => lines.push(format!("  default_port = {}", port)),
        None => lines.push(format!("  default_port = (not set, using {})", DEFAULT_PORT)),
    }

    match config.host {
        Some(host) => lines.push(format!("  host = \"{}\"", host)),
        None => lines.push("  host = (not set, using 127.0.0.1)".to_string()),
    }

    match config.public_url {
        Some(ref url) => lines.push(format!("  public_url = \"{}\"", url)),
        None => lines.push("  public_url = (not set, using request host)".to_string()),
    }

    match config.ttl_secs {
        Some(ttl) => lines.push(format!("  ttl_secs = {}", ttl)),
        None => lines.push(format!("  ttl_secs = (not set, using {})", DEFAULT_TTL_SECS)),
    }

    match config.max_body_bytes {
        Some(max) => lines.push(format!("  max_body_bytes = {}", max)),
        None => lines.push(format!(
            "  max_body_bytes = (not set, using {})",
            DEFAULT_MAX_BODY_BYTES
        )),
    }

    lines.join("\n")
}
