#![allow(clippy::unwrap_used)]
// Asset tree and event hub against a mock backend.

use serde_json::json;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mmp_api::ApiClient;
use mmp_core::{AssetTree, ConnectionState, EventHub, ROOT_ID, Subscription};

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn page(ids: &[(&str, &str)], total_pages: u32) -> serde_json::Value {
    let assets: Vec<_> = ids
        .iter()
        .map(|(id, kind)| json!({ "id": id, "label": id, "node_kind": kind }))
        .collect();
    json!({ "assets": assets, "total_pages": total_pages })
}

#[tokio::test]
async fn test_root_listing_drains_all_pages() {
    let (server, client) = setup().await;

    for (n, ids) in [(0, [("d1", "dir")]), (1, [("f1", "file")]), (2, [("b1", "bundle")])] {
        Mock::given(method("GET"))
            .and(path("/api/assets"))
            .and(query_param("page", n.to_string()))
            .and(query_param("per_page", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&ids, 3)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let tree = AssetTree::new(client);
    let children = tree.get_children(ROOT_ID).await.unwrap();
    assert_eq!(*children, vec!["d1", "f1", "b1"]);
    assert!(tree.get_item("d1").is_folder);
    assert!(!tree.get_item("f1").is_folder);

    // Second call is served from cache; `expect(1)` verifies on drop.
    tree.get_children(ROOT_ID).await.unwrap();
}

#[tokio::test]
async fn test_nested_listing_uses_node_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets/d1/nested"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [{ "id": "f2", "label": "cube", "extension": "stl", "node_kind": "file" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tree = AssetTree::new(client);
    let children = tree.get_children("d1").await.unwrap();
    assert_eq!(*children, vec!["f2"]);
    assert_eq!(tree.get_item("f2").name, "cube.stl");
}

#[tokio::test]
async fn test_failed_listing_is_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/assets"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "db down" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&[("a", "dir")], 1)))
        .mount(&server)
        .await;

    let tree = AssetTree::new(client);
    let err = tree.get_children(ROOT_ID).await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    let children = tree.get_children(ROOT_ID).await.unwrap();
    assert_eq!(*children, vec!["a"]);
}

#[tokio::test]
async fn test_reveal_walks_parents() {
    let (server, client) = setup().await;

    for (id, kind, parent) in [
        ("f", "file", Some("d2")),
        ("d2", "dir", Some("d1")),
        ("d1", "dir", Some("r")),
        ("r", "root", None),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/api/assets/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id, "node_kind": kind, "parent_id": parent
            })))
            .mount(&server)
            .await;
    }

    let tree = AssetTree::new(client);
    let added = tree.reveal("f").await.unwrap();
    assert_eq!(added, vec!["d2", "d1"]);
    assert_eq!(tree.expanded(), vec![ROOT_ID, "d2", "d1"]);
}

#[tokio::test]
async fn test_hub_dispatches_sse_frames() {
    let (server, client) = setup().await;

    let body = concat!(
        "data: {\"event\":\"printer.update.42.bed\",\"state\":{\"temperature\":60}}\n\n",
        "event: printer.update.42.bed\n",
        "data: {\"target\":65}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let hub = EventHub::sse(client);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut state = hub.watch_state();
    hub.on_connect({
        let hub = hub.clone();
        move || {
            let tx = tx.clone();
            hub.subscribe(Subscription::new("test", "printer.update.42.bed", move |evt| {
                let _ = tx.send(evt.state.clone());
            }))
            .unwrap();
        }
    });
    hub.connect();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.get("temperature"), Some(&json!(60)));
    let second = rx.recv().await.unwrap();
    assert_eq!(second.get("target"), Some(&json!(65)));

    // The body ends, and there is no reconnect.
    state.wait_for(|s| s.error().is_some()).await.unwrap();
    assert!(matches!(hub.state(), ConnectionState::Error { .. }));
    hub.close();
}
