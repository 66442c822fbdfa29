//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use mmp_config::ConfigError;
use mmp_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to backend at {url}")]
    #[diagnostic(
        code(mmp::connection_failed),
        help(
            "Check that the backend is running and serves /events.\n\
             Reason: {reason}\n\
             Try: mmp status --backend <URL>"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend unreachable: {reason}")]
    #[diagnostic(
        code(mmp::unreachable),
        help("The request was sent but nothing came back. Is the backend up?")
    )]
    Unreachable { reason: String },

    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(mmp::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Asset '{identifier}' not found")]
    #[diagnostic(code(mmp::not_found), help("Run: mmp tree to browse the library"))]
    NotFound { identifier: String },

    #[error("{title} (HTTP {status})")]
    #[diagnostic(code(mmp::api_error), help("{description}"))]
    Api {
        status: u16,
        title: String,
        description: String,
    },

    #[error("Request failed: {message}")]
    #[diagnostic(code(mmp::request))]
    Request { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mmp::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Config file already exists at {path}")]
    #[diagnostic(code(mmp::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(mmp::config),
        help("Check the config file, or print its location with: mmp config path")
    )]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(mmp::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::NotConnected => Self::ConnectionFailed {
                url: "(event stream)".into(),
                reason: err.to_string(),
            },
            CoreError::Unreachable { reason } => Self::Unreachable { reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::NotFound { identifier } => Self::NotFound { identifier },
            CoreError::Api { status, ref message } => Self::Api {
                status,
                title: "API error".into(),
                description: message.clone().unwrap_or_else(|| err.to_string()),
            },
            CoreError::Config { message } => Self::Validation {
                field: "backend".into(),
                reason: message,
            },
            CoreError::RequestSetup { reason } => Self::Request { message: reason },
            CoreError::Cancelled | CoreError::Internal(_) => Self::Request {
                message: err.to_string(),
            },
        }
    }
}
