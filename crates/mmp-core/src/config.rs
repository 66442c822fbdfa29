// ── Runtime connection configuration ──
//
// These types describe how to reach the backend and how to page through
// it. They never touch disk: the CLI (via mmp-config) builds them and
// hands them in.

use std::time::Duration;

use url::Url;

use mmp_api::transport::{TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Where the backend lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// API root, e.g. `http://localhost:8000/api`.
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Translate into the api crate's transport settings.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    /// Build an `ApiClient` for this backend.
    pub fn api_client(&self) -> Result<mmp_api::ApiClient, crate::CoreError> {
        Ok(mmp_api::ApiClient::new(self.url.clone(), &self.transport())?)
    }
}

/// Paging for the lazy asset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    pub per_page: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            per_page: crate::tree::PER_PAGE,
        }
    }
}
