// REST client for the backend.
//
// Wraps `reqwest::Client` with base-URL joining, 0-based pagination
// parameters, and error-body extraction. The same HTTP client is reused
// for the event stream request.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{Asset, AssetPage};
use crate::transport::TransportConfig;

/// HTTP client for the backend REST API.
///
/// `base_url` is the API root, e.g. `http://localhost:8000/api`; every
/// endpoint path is appended to it segment by segment, so ids are
/// percent-encoded.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
        }
    }

    /// The backend API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append path segments to the base URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!(url = %url, ?query, "GET");
        let resp = self
            .http
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: extract_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Asset endpoints ──────────────────────────────────────────────

    /// `GET /assets?page=&per_page=` -- top-level assets of the library.
    pub async fn list_assets(&self, page: u32, per_page: u32) -> Result<AssetPage, Error> {
        let url = self.endpoint(&["assets"])?;
        self.get_json(url, &page_query(page, per_page)).await
    }

    /// `GET /assets/{id}/nested?page=&per_page=` -- direct children of an asset.
    pub async fn list_nested(
        &self,
        id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<AssetPage, Error> {
        let url = self.endpoint(&["assets", id, "nested"])?;
        self.get_json(url, &page_query(page, per_page)).await
    }

    /// `GET /assets/{id}`
    pub async fn get_asset(&self, id: &str) -> Result<Asset, Error> {
        let url = self.endpoint(&["assets", id])?;
        self.get_json(url, &[]).await
    }

    /// Build the long-lived `GET /events` request for the SSE stream.
    pub fn events_request(&self) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.endpoint(&["events"])?;
        Ok(self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream"))
    }
}

fn page_query(page: u32, per_page: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("per_page", per_page.to_string())]
}

/// Pull a human-readable `message` out of an error body, if it has one.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_appends_segments() {
        let c = client("http://localhost:8000/api");
        let url = c.endpoint(&["assets", "abc", "nested"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/assets/abc/nested");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let c = client("http://localhost:8000/api/");
        let url = c.endpoint(&["events"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/events");
    }

    #[test]
    fn endpoint_encodes_ids() {
        let c = client("http://localhost:8000/api");
        let url = c.endpoint(&["assets", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/assets/a%20b%2Fc");
    }

    #[test]
    fn extract_message_variants() {
        assert_eq!(
            extract_message(r#"{"message":"no such asset"}"#).as_deref(),
            Some("no such asset")
        );
        assert_eq!(extract_message(r#"{"message":""}"#), None);
        assert_eq!(extract_message(r#"{"message":null}"#), None);
        assert_eq!(extract_message(r#"{"message":42}"#).as_deref(), Some("42"));
        assert_eq!(extract_message("plain text"), None);
    }
}
