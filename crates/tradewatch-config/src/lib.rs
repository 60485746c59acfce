//! Shared configuration for tradewatch consumers.
//!
//! TOML file plus `TRADEWATCH_` environment overrides, bearer-token
//! resolution (env + keyring + plaintext), and translation to
//! `tradewatch_core::SessionConfig`.

pub mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tradewatch_core::{CacheSettings, SessionConfig, StorageBackend};

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "tradewatch";
const KEYRING_USER: &str = "api-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiSection {
    /// Backend root URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Bearer token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            token: None,
            token_env: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.tradewatch.example/".into()
}
fn default_timeout() -> u64 {
    30
}

/// Query cache tuning. Durations are in milliseconds.
#[derive(Debug, Deserialize, Serialize)]
pub struct CacheSection {
    #[serde(default = "default_stale_time")]
    pub stale_time_ms: u64,

    /// `0` evicts unobserved queries immediately.
    #[serde(default = "default_gc_time")]
    pub gc_time_ms: u64,

    #[serde(default = "default_retry")]
    pub retry: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Wait before refetching after a successful mutation.
    #[serde(default = "default_invalidation_delay")]
    pub invalidation_delay_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            stale_time_ms: default_stale_time(),
            gc_time_ms: default_gc_time(),
            retry: default_retry(),
            retry_delay_ms: default_retry_delay(),
            invalidation_delay_ms: default_invalidation_delay(),
        }
    }
}

fn default_stale_time() -> u64 {
    30_000
}
fn default_gc_time() -> u64 {
    300_000
}
fn default_retry() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1_000
}
fn default_invalidation_delay() -> u64 {
    2_000
}

impl CacheSection {
    pub fn to_settings(&self) -> CacheSettings {
        CacheSettings {
            stale_time: Duration::from_millis(self.stale_time_ms),
            gc_time: Duration::from_millis(self.gc_time_ms),
            retry: self.retry,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            invalidation_delay: Duration::from_millis(self.invalidation_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StorageSection {
    /// Keep profile and protocol selection across runs.
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// Override the platform data directory.
    pub dir: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            persist: default_persist(),
            dir: None,
        }
    }
}

fn default_persist() -> bool {
    true
}

impl StorageSection {
    pub fn to_backend(&self) -> StorageBackend {
        if !self.persist {
            return StorageBackend::Memory;
        }
        let dir = self.dir.clone().unwrap_or_else(data_dir);
        StorageBackend::Directory(dir)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tradewatch", "tradewatch")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tradewatch");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for persisted state slices.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state"),
        |dirs| dirs.data_dir().join("state"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment.
///
/// Nested keys are separated by a double underscore in the environment:
/// `TRADEWATCH_API__BASE_URL`, `TRADEWATCH_CACHE__RETRY`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TRADEWATCH_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), base_url = %config.api.base_url, "config loaded");
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the bearer token: env var named by `token_env`, then the
/// system keyring, then plaintext in config. `None` means anonymous.
pub fn resolve_token(api: &ApiSection) -> Option<SecretString> {
    // 1. Env var named in config
    if let Some(ref env_name) = api.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    api.token.clone().map(SecretString::from)
}

/// Store `token` in the system keyring for later runs.
pub fn store_token(token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?.set_password(token)?;
    Ok(())
}

/// Remove the keyring token, if any.
pub fn forget_token() -> Result<(), ConfigError> {
    match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SessionConfig` from loaded config.
pub fn to_session_config(cfg: &Config) -> Result<SessionConfig, ConfigError> {
    let base_url: url::Url = cfg
        .api
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api.base_url".into(),
            reason: format!("invalid URL: {}", cfg.api.base_url),
        })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api.base_url".into(),
            reason: format!("expected http or https, got '{}'", base_url.scheme()),
        });
    }
    if cfg.api.timeout == 0 {
        return Err(ConfigError::Validation {
            field: "api.timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut session = SessionConfig::new(base_url)
        .with_cache(cfg.cache.to_settings())
        .with_storage(cfg.storage.to_backend());
    session.timeout = Duration::from_secs(cfg.api.timeout);
    session.token = resolve_token(&cfg.api);
    Ok(session)
}
