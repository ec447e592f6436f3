//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/satisbot/config.toml`, or from the
//! path in `SATISBOT_CONFIG` when that variable is set.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/satisbot/` (~/.config/satisbot/)
//! - State/Logs: `$XDG_STATE_HOME/satisbot/` (~/.local/state/satisbot/)

use crate::error::{Error, Result};
use crate::purge::RetentionPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "SATISBOT_CONFIG";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Chat channel that receives notifications
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Dedicated server address and query settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Minutes between server probes
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u64,

    /// Server log location
    #[serde(default)]
    pub log: LogConfig,

    /// Message retention
    #[serde(default)]
    pub purge: PurgeConfig,

    /// Suppress "unreachable" / "found again" messages
    #[serde(default)]
    pub disable_unreachable_found_messages: bool,

    /// Announce player joins/leaves even while the server is not known online
    #[serde(default)]
    pub ignore_poll_state_when_messaging: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Notification target
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DiscordConfig {
    /// Guild (server) name, informational
    #[serde(default)]
    pub server_name: String,
    /// Text channel name
    #[serde(default)]
    pub channel_name: String,
}

/// Dedicated server connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_ip")]
    pub ip: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: default_server_ip(),
            port: default_server_port(),
            max_players: default_max_players(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

fn default_server_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    7777
}

fn default_max_players() -> u32 {
    4
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_minutes() -> u64 {
    1
}

/// Server log location
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// Path to the server's console log (FactoryGame.log)
    pub location: Option<PathBuf>,
    /// Poll the file on an interval instead of using filesystem notifications
    #[serde(default)]
    pub use_watch_file: bool,
}

/// Message retention settings
#[derive(Debug, Deserialize, Clone)]
pub struct PurgeConfig {
    /// Guild name, informational
    #[serde(default)]
    pub server_name: String,
    /// Channel whose history is purged
    #[serde(default)]
    pub channel_name: String,
    /// Keep messages newer than this many days (negative disables)
    #[serde(default = "default_disabled")]
    pub after_days: i64,
    /// Keep this many newest messages (negative disables)
    #[serde(default = "default_disabled")]
    pub after_lines: i64,
    /// UTC hour of the daily purge
    #[serde(default = "default_purge_hour")]
    pub hour: u32,
    /// Also purge once at startup
    #[serde(default)]
    pub on_startup: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            channel_name: String::new(),
            after_days: default_disabled(),
            after_lines: default_disabled(),
            hour: default_purge_hour(),
            on_startup: false,
        }
    }
}

impl PurgeConfig {
    /// Retention thresholds for the purge engine
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.after_days, self.after_lines)
    }

    /// Whether purging is switched on at all
    pub fn is_enabled(&self) -> bool {
        self.policy().will_purge()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 {
            return Err(Error::Config(format!(
                "purge.hour must be between 0 and 23, got {}",
                self.hour
            )));
        }
        if self.is_enabled() && self.channel_name.trim().is_empty() {
            return Err(Error::Config(
                "purge.channel_name is required when purging is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_disabled() -> i64 {
    -1
}

fn default_purge_hour() -> u32 {
    2
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from `SATISBOT_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must not be 0".to_string()));
        }
        if self.poll_interval_minutes == 0 {
            return Err(Error::Config(
                "poll_interval_minutes must be at least 1".to_string(),
            ));
        }
        self.purge.validate()
    }

    /// Returns the config file path
    ///
    /// `$SATISBOT_CONFIG`, else `$XDG_CONFIG_HOME/satisbot/config.toml`
    pub fn config_path() -> PathBuf {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => xdg_config_home().join("satisbot").join("config.toml"),
        }
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/satisbot/` (~/.local/state/satisbot/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("satisbot")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/satisbot/satisbot.log` (~/.local/state/satisbot/satisbot.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("satisbot.log")
    }
}
