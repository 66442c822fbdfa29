//! Shared configuration for mmp tools.
//!
//! A TOML file layered under `MMP_` environment variables, and translation
//! into the runtime configs `mmp_core` consumes. Core crates never read
//! files; this crate is the only place that does.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mmp_core::{BackendConfig, TlsVerification, ToastLimits, TreeConfig};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "MMP_CONFIG";

const ENV_PREFIX: &str = "MMP_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub tree: TreeSection,

    #[serde(default)]
    pub toasts: ToastSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendSection {
    /// API root, e.g. "http://localhost:8000/api".
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TreeSection {
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for TreeSection {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
        }
    }
}

fn default_per_page() -> u32 {
    mmp_core::tree::PER_PAGE
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToastSection {
    pub dedup_window_ms: u64,
    pub max_per_window: u32,
    pub max_queue_depth: u32,
    pub max_cache_size: usize,
    pub cleanup_interval_ms: u64,
}

impl Default for ToastSection {
    fn default() -> Self {
        let limits = ToastLimits::default();
        Self {
            dedup_window_ms: millis(limits.dedup_window),
            max_per_window: limits.max_per_window,
            max_queue_depth: limits.max_queue_depth,
            max_cache_size: limits.max_cache_size,
            cleanup_interval_ms: millis(limits.cleanup_interval),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `MMP_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "mmp", "mmp").map_or_else(
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
    p.push("mmp");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest with `__`: `MMP_BACKEND__URL` sets `backend.url`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                // Flat CLI variables, not config keys.
                .ignore(&["config", "backend"]),
        );

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
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime configs ──────────────────────────────────

impl Config {
    /// Build a `BackendConfig`, validating the URL and timeout.
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        let backend = &self.backend;
        let url: url::Url = backend
            .url
            .parse()
            .map_err(|e| invalid("backend.url", format!("{e}: {}", backend.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "backend.url",
                format!("expected an http or https URL, got '{}'", backend.url),
            ));
        }
        if backend.timeout == 0 {
            return Err(invalid("backend.timeout", "must be at least 1 second"));
        }

        let tls = if backend.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = backend.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(BackendConfig {
            url,
            tls,
            timeout: Duration::from_secs(backend.timeout),
        })
    }

    pub fn tree_config(&self) -> Result<TreeConfig, ConfigError> {
        if self.tree.per_page == 0 {
            return Err(invalid("tree.per_page", "must be at least 1"));
        }
        Ok(TreeConfig {
            per_page: self.tree.per_page,
        })
    }

    pub fn toast_limits(&self) -> Result<ToastLimits, ConfigError> {
        let t = &self.toasts;
        if t.dedup_window_ms == 0 {
            return Err(invalid("toasts.dedup_window_ms", "must be positive"));
        }
        if t.cleanup_interval_ms == 0 {
            return Err(invalid("toasts.cleanup_interval_ms", "must be positive"));
        }
        Ok(ToastLimits {
            max_cache_size: t.max_cache_size,
            dedup_window: Duration::from_millis(t.dedup_window_ms),
            max_per_window: t.max_per_window,
            max_queue_depth: t.max_queue_depth,
            cleanup_interval: Duration::from_millis(t.cleanup_interval_ms),
        })
    }
}
