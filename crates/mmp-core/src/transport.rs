// ── Push transport seam ──
//
// The hub reads from a `PushTransport`. Production uses the SSE stream
// from mmp-api; tests feed frames through a channel.

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};

use mmp_api::{ApiClient, StreamEvent};

/// A source of push events. Each `open` starts a fresh connection.
pub trait PushTransport: Send + Sync + 'static {
    fn open(&self) -> BoxStream<'static, Result<StreamEvent, mmp_api::Error>>;

    /// Human-readable target, used in logs and connection errors.
    fn describe(&self) -> String {
        "push transport".to_owned()
    }
}

/// Server-Sent Events from `{base}/events`.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: ApiClient,
}

impl SseTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl PushTransport for SseTransport {
    fn open(&self) -> BoxStream<'static, Result<StreamEvent, mmp_api::Error>> {
        match mmp_api::open_event_stream(&self.client) {
            Ok(events) => events.boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    fn describe(&self) -> String {
        self.client.base_url().to_string()
    }
}
