// Error → notification policy.

use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;

/// Whether an error is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Silent,
    Toast,
}

/// How one error should be surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorConfig {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(with = "millis")]
    pub duration: Duration,
    pub retryable: bool,
}

impl ErrorConfig {
    fn silent() -> Self {
        Self {
            severity: Severity::Silent,
            title: String::new(),
            description: String::new(),
            duration: Duration::ZERO,
            retryable: false,
        }
    }

    fn toast(title: &str, description: String, duration_ms: u64, retryable: bool) -> Self {
        Self {
            severity: Severity::Toast,
            title: title.to_owned(),
            description,
            duration: Duration::from_millis(duration_ms),
            retryable,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.severity == Severity::Silent
    }

    /// Classify `err`. `is_offline` reflects the host's network state.
    pub fn for_error(err: &CoreError, is_offline: bool) -> Self {
        match err {
            CoreError::Cancelled | CoreError::NotFound { .. } => Self::silent(),

            // The request went out and nothing came back.
            CoreError::Unreachable { .. }
            | CoreError::Timeout { .. }
            | CoreError::ConnectionFailed { .. }
            | CoreError::NotConnected => {
                if is_offline {
                    Self::toast(
                        "Offline",
                        "You appear to be offline. Please check your connection.".into(),
                        8000,
                        true,
                    )
                } else {
                    Self::toast("Network Error", err.to_string(), 8000, true)
                }
            }

            // The request never left.
            CoreError::RequestSetup { .. } | CoreError::Config { .. } | CoreError::Internal(_) => {
                Self::toast("Request Error", err.to_string(), 5000, false)
            }

            CoreError::Api { status, message } => Self::for_status(*status, message.as_deref()),
        }
    }

    fn for_status(status: u16, message: Option<&str>) -> Self {
        let described = |default: &str| {
            message
                .filter(|m| !m.is_empty())
                .map_or_else(|| default.to_owned(), str::to_owned)
        };

        match status {
            401 => Self::toast(
                "Unauthorized",
                described("Your session has expired. Please refresh the page."),
                6000,
                false,
            ),
            403 => Self::toast(
                "Forbidden",
                described("You don't have permission to perform this action."),
                5000,
                false,
            ),
            404 => Self::silent(),
            429 => Self::toast(
                "Too Many Requests",
                described("Rate limit exceeded. Please try again later."),
                5000,
                true,
            ),
            500 => Self::toast(
                "Server Error",
                described("An internal server error occurred. Please try again later."),
                6000,
                true,
            ),
            502..=504 => Self::toast(
                "Service Unavailable",
                described("The service is temporarily unavailable. Please try again later."),
                6000,
                true,
            ),
            _ => Self::toast(
                "Request Failed",
                described(&format!("An error occurred ({status}).")),
                5000,
                status >= 500,
            ),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn api(status: u16, message: Option<&str>) -> CoreError {
        CoreError::Api {
            status,
            message: message.map(str::to_owned),
        }
    }

    #[test]
    fn cancelled_and_not_found_are_silent() {
        assert!(ErrorConfig::for_error(&CoreError::Cancelled, false).is_silent());
        assert!(ErrorConfig::for_error(&api(404, Some("gone")), false).is_silent());
        assert!(
            ErrorConfig::for_error(
                &CoreError::NotFound {
                    identifier: "a".into()
                },
                false
            )
            .is_silent()
        );
    }

    #[test]
    fn no_response_depends_on_offline() {
        let err = CoreError::Unreachable {
            reason: "connection refused".into(),
        };
        let online = ErrorConfig::for_error(&err, false);
        assert_eq!(online.title, "Network Error");
        assert!(online.description.contains("connection refused"));
        assert_eq!(online.duration, Duration::from_millis(8000));
        assert!(online.retryable);

        let offline = ErrorConfig::for_error(&err, true);
        assert_eq!(offline.title, "Offline");
        assert!(offline.retryable);
    }

    #[test]
    fn setup_failure_is_request_error() {
        let cfg = ErrorConfig::for_error(
            &CoreError::RequestSetup {
                reason: "bad header".into(),
            },
            false,
        );
        assert_eq!(cfg.title, "Request Error");
        assert_eq!(cfg.duration, Duration::from_millis(5000));
        assert!(!cfg.retryable);
    }

    #[test]
    fn status_table() {
        let cases = [
            (401, "Unauthorized", 6000, false),
            (403, "Forbidden", 5000, false),
            (429, "Too Many Requests", 5000, true),
            (500, "Server Error", 6000, true),
            (502, "Service Unavailable", 6000, true),
            (503, "Service Unavailable", 6000, true),
            (504, "Service Unavailable", 6000, true),
            (418, "Request Failed", 5000, false),
            (507, "Request Failed", 5000, true),
        ];
        for (status, title, ms, retryable) in cases {
            let cfg = ErrorConfig::for_error(&api(status, None), false);
            assert_eq!(cfg.severity, Severity::Toast, "{status}");
            assert_eq!(cfg.title, title, "{status}");
            assert_eq!(cfg.duration, Duration::from_millis(ms), "{status}");
            assert_eq!(cfg.retryable, retryable, "{status}");
        }
    }

    #[test]
    fn server_message_wins_over_default() {
        let cfg = ErrorConfig::for_error(&api(500, Some("disk full")), false);
        assert_eq!(cfg.description, "disk full");

        let cfg = ErrorConfig::for_error(&api(418, None), false);
        assert_eq!(cfg.description, "An error occurred (418).");
    }
}
