//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage root shared with the agent.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Conversational exchange settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest request body accepted, in bytes. Upload batches carry
    /// base64, so this must comfortably exceed the 5 MiB per-file limit.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Storage root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Agent workspace directory. When unset, uploads fail with 500 and the
    /// memory/file listings are empty.
    #[serde(default = "default_workspace_path")]
    pub path: Option<PathBuf>,
}

/// Timeouts and commands for exchanges with the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// How long `POST /chat` waits for a reply.
    #[serde(default = "default_chat_timeout_secs")]
    pub chat_timeout_secs: u64,

    /// How long `DELETE /conversations` waits for the reset acknowledgement.
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,

    /// Control command the agent recognizes as "start a new session".
    #[serde(default = "default_reset_command")]
    pub reset_command: String,

    /// Run the built-in echo agent instead of waiting for an external one.
    #[serde(default = "default_loopback")]
    pub loopback: bool,

    /// Interval for sweeping stale pending requests. `0` disables the sweeper.
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl AgentConfig {
    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "courier_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    30 * 1024 * 1024
}

fn default_workspace_path() -> Option<PathBuf> {
    Some(PathBuf::from("workspace"))
}

fn default_chat_timeout_secs() -> u64 {
    120
}

fn default_reset_timeout_secs() -> u64 {
    30
}

fn default_reset_command() -> String {
    "/new".to_string()
}

fn default_loopback() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            path: default_workspace_path(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            chat_timeout_secs: default_chat_timeout_secs(),
            reset_timeout_secs: default_reset_timeout_secs(),
            reset_command: default_reset_command(),
            loopback: default_loopback(),
            sweep_interval_secs: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_env_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies environment overrides, which take precedence over the file:
/// - `COURIER_HOST` overrides `server.host`
/// - `COURIER_PORT` overrides `server.port`
/// - `COURIER_WORKSPACE` overrides `workspace.path` (empty unsets it)
/// - `COURIER_LOOPBACK` overrides `agent.loopback` ("true"/"1" to enable)
/// - `COURIER_LOG_LEVEL` overrides `logging.level`
/// - `COURIER_LOG_JSON` overrides `logging.json` ("true"/"1" to enable)
///
/// Values that fail to parse are ignored with a warning.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("COURIER_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring unparsable COURIER_HOST"),
        }
    }
    if let Some(port) = lookup("COURIER_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring unparsable COURIER_PORT"),
        }
    }
    if let Some(workspace) = lookup("COURIER_WORKSPACE") {
        config.workspace.path = if workspace.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(workspace))
        };
    }
    if let Some(loopback) = lookup("COURIER_LOOPBACK") {
        config.agent.loopback = loopback == "true" || loopback == "1";
    }
    if let Some(level) = lookup("COURIER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("COURIER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
