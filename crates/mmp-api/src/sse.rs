//! Server-Sent Events stream from the backend's `/events` endpoint.
//!
//! Opens one long-lived request and yields decoded [`RawEvent`]s. The
//! stream never reconnects on its own: the first transport failure is
//! yielded as an error and the stream ends. Whoever owns the connection
//! decides whether to open a new one.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use mmp_api::{ApiClient, sse::{open_event_stream, StreamEvent}};
//!
//! let mut events = open_event_stream(&client)?;
//! while let Some(item) = events.next().await {
//!     match item? {
//!         StreamEvent::Open => println!("connected"),
//!         StreamEvent::Message(evt) => println!("{}: {}", evt.event, evt.state),
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use reqwest_eventsource::{Event as SseEvent, EventSource, retry::Never};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::Error;

// ── RawEvent ─────────────────────────────────────────────────────────

/// A named push event with its opaque JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event name, e.g. `"printer.update.42.bed"` or `"system.state.asset.event"`.
    pub event: String,

    /// Payload as sent by the backend. Usually a partial state object.
    pub state: serde_json::Value,

    /// When this client received the frame.
    pub received_at: DateTime<Utc>,
}

/// Items yielded by [`open_event_stream`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The HTTP response arrived and the stream is live.
    Open,
    /// A decoded event frame.
    Message(RawEvent),
}

// ── Stream ───────────────────────────────────────────────────────────

/// Open the `/events` stream.
///
/// Returns immediately; the request is sent on first poll. The stream
/// yields `Ok(StreamEvent::Open)` once the backend accepts the request,
/// then one `Ok(StreamEvent::Message)` per decodable frame. It finishes
/// after the first `Err`.
pub fn open_event_stream(
    client: &ApiClient,
) -> Result<impl Stream<Item = Result<StreamEvent, Error>> + Send + 'static, Error> {
    let request = client.events_request()?;
    let mut source =
        EventSource::new(request).map_err(|e| Error::EventStream(e.to_string()))?;
    source.set_retry_policy(Box::new(Never));

    Ok(async_stream::stream! {
        while let Some(item) = source.next().await {
            match item {
                Ok(SseEvent::Open) => {
                    tracing::info!("event stream opened");
                    yield Ok(StreamEvent::Open);
                }
                Ok(SseEvent::Message(msg)) => {
                    if let Some(evt) = parse_frame(&msg.event, &msg.data) {
                        yield Ok(StreamEvent::Message(evt));
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    tracing::info!("event stream ended by server");
                    source.close();
                    yield Err(Error::StreamEnded);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "event stream failed");
                    source.close();
                    yield Err(map_stream_error(e));
                    break;
                }
            }
        }
    })
}

fn map_stream_error(err: reqwest_eventsource::Error) -> Error {
    match err {
        reqwest_eventsource::Error::Transport(e) => Error::Transport(e),
        reqwest_eventsource::Error::InvalidStatusCode(status, _) => Error::Http {
            status: status.as_u16(),
            message: None,
        },
        other => Error::EventStream(other.to_string()),
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Envelope form: `data: {"event": "...", "state": {...}}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    state: serde_json::Value,
}

/// Decode one SSE frame into a [`RawEvent`].
///
/// Accepts the `{event, state}` envelope in `data`, or a named SSE event
/// (`event:` line) whose `data` is the payload. Returns `None` for frames
/// that carry neither, e.g. keep-alive comments or unnamed plain messages.
pub fn parse_frame(event_field: &str, data: &str) -> Option<RawEvent> {
    let received_at = Utc::now();
    let payload: Option<serde_json::Value> = serde_json::from_str(data).ok();

    if let Some(value) = &payload {
        if value.get("event").is_some_and(serde_json::Value::is_string)
            && value.get("state").is_some()
        {
            if let Ok(env) = serde_json::from_value::<Envelope>(value.clone()) {
                return Some(RawEvent {
                    event: env.event,
                    state: env.state,
                    received_at,
                });
            }
        }
    }

    if event_field.is_empty() || event_field == "message" {
        tracing::debug!(data, "dropping unnamed event frame");
        return None;
    }

    Some(RawEvent {
        event: event_field.to_string(),
        state: payload.unwrap_or_else(|| serde_json::Value::String(data.to_string())),
        received_at,
    })
}

// ── Tests ────────────────────────────────────────────────────────────
