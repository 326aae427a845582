//! Shared configuration for the `cgate` tool.
//!
//! TOML profiles naming a gateway and the project/network to work with,
//! `CGATE_`-prefixed environment overrides, and translation to
//! `cgate_core::GatewayConfig`. The CLI layers its own flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cgate_core::GatewayConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile named by `name`, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Sorted profile names.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Command response timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}

/// A named gateway profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway host name or IP address.
    pub host: String,

    /// Command-interface port. Defaults to 20023.
    pub port: Option<u16>,

    /// C-Gate project name, e.g. `HOME`.
    pub project: String,

    /// C-Bus network number within the project.
    #[serde(default = "default_network")]
    pub network: u8,

    /// Override the response timeout (seconds, 0 waits forever).
    pub timeout: Option<u64>,

    /// First reconnect delay in milliseconds.
    pub reconnect_delay_ms: Option<u64>,

    /// Upper bound on the reconnect delay in milliseconds.
    pub reconnect_max_delay_ms: Option<u64>,

    /// Give up after this many consecutive failed connection attempts.
    pub max_retries: Option<u32>,

    /// Re-fetch the object snapshot every N seconds.
    pub refresh_interval: Option<u64>,
}

fn default_network() -> u8 {
    254
}

impl Profile {
    pub fn new(host: impl Into<String>, project: impl Into<String>, network: u8) -> Self {
        Self {
            host: host.into(),
            port: None,
            project: project.into(),
            network,
            timeout: None,
            reconnect_delay_ms: None,
            reconnect_max_delay_ms: None,
            max_retries: None,
            refresh_interval: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "cgate", "cgate").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cgate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, then apply `CGATE_` environment overrides.
///
/// Nested keys use a double underscore: `CGATE_PROFILES__HOME__NETWORK=17`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CGATE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `GatewayConfig` from a profile and the global defaults.
pub fn profile_to_gateway_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }

    let mut config = GatewayConfig::new(profile.host.trim(), &profile.project, profile.network);
    if let Some(port) = profile.port {
        config.port = port;
    }
    config
        .network_address()
        .map_err(|e| ConfigError::Validation {
            field: "project".into(),
            reason: e.to_string(),
        })?;

    config.connect_timeout = Duration::from_secs(defaults.connect_timeout);
    config.response_timeout = match profile.timeout.unwrap_or(defaults.timeout) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    if let Some(ms) = profile.reconnect_delay_ms {
        config.reconnect.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = profile.reconnect_max_delay_ms {
        config.reconnect.max_delay = Duration::from_millis(ms);
    }
    if config.reconnect.max_delay < config.reconnect.initial_delay {
        return Err(ConfigError::Validation {
            field: "reconnect_max_delay_ms".into(),
            reason: "must not be shorter than reconnect_delay_ms".into(),
        });
    }
    config.reconnect.max_retries = profile.max_retries;
    config.refresh_interval = profile
        .refresh_interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    Ok(config)
}
