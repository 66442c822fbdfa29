// ── Core error types ──
//
// Errors surfaced by mmp-core. Transport details are folded into a small
// taxonomy that the notification layer can classify: no response, request
// never sent, cancelled, or a status code from the backend.
//
// `CoreError` is `Clone` because one failed tree fetch is observed by every
// caller that joined it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Event connection is not ready")]
    NotConnected,

    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The request went out but no response came back.
    #[error("Backend unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The request could not be built or sent at all.
    #[error("Request could not be sent: {reason}")]
    RequestSetup { reason: String },

    #[error("Request cancelled")]
    Cancelled,

    // ── Response errors ──────────────────────────────────────────────
    #[error("API error (HTTP {status}): {}", message.as_deref().unwrap_or("request failed"))]
    Api {
        status: u16,
        /// The backend's own message, if it sent one.
        message: Option<String>,
    },

    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<mmp_api::Error> for CoreError {
    fn from(err: mmp_api::Error) -> Self {
        match err {
            mmp_api::Error::Transport(ref e) => {
                if e.is_builder() {
                    CoreError::RequestSetup {
                        reason: e.to_string(),
                    }
                } else if let Some(status) = e.status().map(|s| s.as_u16()) {
                    if status == 404 {
                        CoreError::NotFound {
                            identifier: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
                        }
                    } else {
                        CoreError::Api {
                            status,
                            message: None,
                        }
                    }
                } else {
                    CoreError::Unreachable {
                        reason: e.to_string(),
                    }
                }
            }
            mmp_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            mmp_api::Error::InvalidUrl(e) => CoreError::RequestSetup {
                reason: format!("invalid URL: {e}"),
            },
            mmp_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            mmp_api::Error::Http {
                status: 404,
                message,
            } => CoreError::NotFound {
                identifier: message.unwrap_or_else(|| "resource".into()),
            },
            mmp_api::Error::Http { status, message } => CoreError::Api { status, message },
            mmp_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            mmp_api::Error::EventStream(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            mmp_api::Error::StreamEnded => CoreError::ConnectionFailed {
                url: String::new(),
                reason: "event stream ended".into(),
            },
        }
    }
}
