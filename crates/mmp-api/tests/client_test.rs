#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` and the event stream using wiremock.

use futures_util::StreamExt;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mmp_api::{ApiClient, Error, NodeKind, StreamEvent, open_event_stream};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn asset(id: &str, node_kind: &str) -> serde_json::Value {
    json!({ "id": id, "node_kind": node_kind, "root": "lib", "fs_kind": "file", "fs_name": id })
}

// ── REST ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_assets_sends_page_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [asset("a", "dir"), asset("b", "file")],
            "total_pages": 3,
            "page": 1,
            "per_page": 200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.list_assets(1, 200).await.unwrap();
    assert_eq!(page.assets.len(), 2);
    assert_eq!(page.total_pages, Some(3));
    assert_eq!(page.assets[1].node_kind, NodeKind::File);
}

#[tokio::test]
async fn test_list_nested_uses_encoded_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets/dir%201/nested"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [asset("c", "file")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.list_nested("dir 1", 0, 50).await.unwrap();
    assert_eq!(page.assets[0].id, "c");
    assert_eq!(page.total_pages, None);
}

#[tokio::test]
async fn test_get_asset() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "label": "Benchy",
            "node_kind": "file",
            "parent_id": "d1",
            "extension": "stl",
            "tags": [{ "value": "boat" }]
        })))
        .mount(&server)
        .await;

    let asset = client.get_asset("a1").await.unwrap();
    assert_eq!(asset.label.as_deref(), Some("Benchy"));
    assert_eq!(asset.parent_id.as_deref(), Some("d1"));
    assert_eq!(asset.tags[0].value, "boat");
}

#[tokio::test]
async fn test_error_status_carries_backend_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "asset not found" })),
        )
        .mount(&server)
        .await;

    let err = client.get_asset("missing").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message.as_deref(), Some("asset not found"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.list_assets(0, 200).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

// ── Event stream ────────────────────────────────────────────────────

#[tokio::test]
async fn test_event_stream_yields_open_messages_then_end() {
    let (server, client) = setup().await;

    let body = concat!(
        "data: {\"event\":\"printer.update.42.bed\",\"state\":{\"temperature\":60}}\n\n",
        ": keep-alive\n\n",
        "event: system.state.tempfile.new\n",
        "data: {\"name\":\"cube.stl\"}\n\n",
        "data: unnamed and not an envelope\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let items: Vec<_> = open_event_stream(&client).unwrap().collect().await;

    assert_eq!(items.len(), 4, "items: {items:?}");
    assert!(matches!(items[0], Ok(StreamEvent::Open)));
    match &items[1] {
        Ok(StreamEvent::Message(evt)) => {
            assert_eq!(evt.event, "printer.update.42.bed");
            assert_eq!(evt.state["temperature"], 60);
        }
        other => panic!("unexpected item {other:?}"),
    }
    match &items[2] {
        Ok(StreamEvent::Message(evt)) => assert_eq!(evt.event, "system.state.tempfile.new"),
        other => panic!("unexpected item {other:?}"),
    }
    assert!(matches!(items[3], Err(Error::StreamEnded)));
}

#[tokio::test]
async fn test_event_stream_bad_status_fails_without_retry() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let items: Vec<_> = open_event_stream(&client).unwrap().collect().await;

    assert_eq!(items.len(), 1, "items: {items:?}");
    assert!(matches!(items[0], Err(Error::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_slow_response_reports_client_timeout() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let transport = mmp_api::TransportConfig {
        timeout: std::time::Duration::from_secs(1),
        ..mmp_api::TransportConfig::default()
    };
    let client = ApiClient::new(base_url, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/assets/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(asset("slow", "file"))
                .set_delay(std::time::Duration::from_millis(2500)),
        )
        .mount(&server)
        .await;

    let err = client.get_asset("slow").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_secs: 1 }), "{err:?}");
    assert_eq!(err.to_string(), "Request timed out after 1s");
}
