use thiserror::Error;

/// Top-level error type for the `mmp-api` crate.
///
/// Covers the REST surface (assets, nested listings) and the Server-Sent
/// Events stream. `mmp-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request ran past the client's timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration error (unreadable or invalid CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// The backend answered with a non-success status.
    ///
    /// `message` is the `message` field of the JSON body when the backend
    /// sent one, otherwise `None`.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("request failed"))]
    Http { status: u16, message: Option<String> },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Event stream ────────────────────────────────────────────────
    /// The SSE request could not be set up or the stream broke.
    #[error("Event stream error: {0}")]
    EventStream(String),

    /// The server closed the event stream.
    #[error("Event stream ended")]
    StreamEnded,
}

impl Error {
    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::EventStream(_) | Self::StreamEnded => true,
            _ => false,
        }
    }
}
