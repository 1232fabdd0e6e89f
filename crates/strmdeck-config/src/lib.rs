//! Shared configuration for strmdeck.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `strmdeck_core::SessionConfig`. The CLI adds flag-aware wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use strmdeck_core::SessionConfig;

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `STRMDECK_DEFAULTS__TIMEOUT=20`.
pub const ENV_PREFIX: &str = "STRMDECK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

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
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-attempt command deadline, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named service profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "http://nas.local:8000").
    pub server: String,

    /// Push-channel path. Defaults to `/ws`.
    pub push_path: Option<String>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override per-attempt timeout, in seconds.
    pub timeout: Option<u64>,

    /// Client ping interval in seconds; `0` disables the heartbeat.
    pub heartbeat: Option<u64>,

    /// Dashboard stats refresh interval, in seconds.
    pub stats_refresh: Option<u64>,

    /// Log lines kept in the session mirror.
    pub log_capacity: Option<usize>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            push_path: None,
            insecure: None,
            timeout: None,
            heartbeat: None,
            stats_refresh: None,
            log_capacity: None,
        }
    }
}

impl Config {
    /// Name of the profile to use: the explicit one, else the configured
    /// default, else `"default"`.
    pub fn profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "strmdeck", "strmdeck").map_or_else(
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
    p.push("strmdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file at `path`, then
/// `STRMDECK_*` environment variables.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file yields
/// the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(figment_for(path).extract()?)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
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

// ── Session config translation ──────────────────────────────────────

/// Build a `SessionConfig` from a profile and the global defaults. No CLI
/// flag overrides are applied here.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let mut config =
        SessionConfig::for_server(&profile.server).map_err(|e| ConfigError::Validation {
            field: "server".into(),
            reason: e.to_string(),
        })?;

    if let Some(path) = &profile.push_path {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation {
                field: "push_path".into(),
                reason: format!("must start with '/', got '{path}'"),
            });
        }
        config.push_path.clone_from(path);
    }

    config.insecure = profile.insecure.unwrap_or(defaults.insecure);

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    config.retry.timeout = Duration::from_secs(timeout);

    match profile.heartbeat {
        Some(0) => config.heartbeat = None,
        Some(secs) => config.heartbeat = Some(Duration::from_secs(secs)),
        None => {}
    }
    if let Some(secs) = profile.stats_refresh.filter(|s| *s > 0) {
        config.stats_refresh = Duration::from_secs(secs);
    }
    if let Some(capacity) = profile.log_capacity.filter(|c| *c > 0) {
        config.log_capacity = capacity;
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn profile_name_falls_back_to_default() {
        let mut cfg = Config::default();
        assert_eq!(cfg.profile_name(None), "default");
        assert_eq!(cfg.profile_name(Some("nas")), "nas");

        cfg.default_profile = Some("office".into());
        assert_eq!(cfg.profile_name(None), "office");
    }

    #[test]
    fn profile_overrides_defaults() {
        let mut profile = Profile::new("https://nas.local:8443");
        profile.timeout = Some(20);
        profile.heartbeat = Some(0);
        profile.push_path = Some("/push".into());

        let cfg = profile_to_session_config(&profile, &Defaults::default()).unwrap();

        assert_eq!(cfg.retry.timeout, Duration::from_secs(20));
        assert_eq!(cfg.heartbeat, None);
        assert_eq!(cfg.push_url().unwrap().as_str(), "wss://nas.local:8443/push");
        assert!(!cfg.insecure);
    }

    #[test]
    fn unset_timeout_keeps_ten_second_deadline() {
        let cfg =
            profile_to_session_config(&Profile::new("http://nas.local"), &Defaults::default())
                .unwrap();
        assert_eq!(cfg.retry.timeout, Duration::from_secs(10));
        assert_eq!(cfg.retry.max_retries, 2);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_url = Profile::new("nas.local");
        assert!(matches!(
            profile_to_session_config(&bad_url, &Defaults::default()),
            Err(ConfigError::Validation { .. })
        ));

        let mut zero = Profile::new("http://nas.local");
        zero.timeout = Some(0);
        assert!(profile_to_session_config(&zero, &Defaults::default()).is_err());
    }

    #[test]
    fn unknown_profile_is_reported() {
        let err = Config::default().profile("nope").unwrap_err();
        assert_eq!(err.to_string(), "profile 'nope' not found");
    }
}
