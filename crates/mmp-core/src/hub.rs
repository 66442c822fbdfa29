// ── Event hub ──
//
// One push connection multiplexed to many subscribers. The hub owns the
// connection state, the subscription registry and the reader task that
// turns frames into callback invocations.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mmp_api::{ApiClient, StreamEvent};

use crate::dispatch;
use crate::error::CoreError;
use crate::event::PushEvent;
use crate::lock;
use crate::subscription::{Subscription, SubscriptionRegistry};
use crate::transport::{PushTransport, SseTransport};

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error { message: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Connecting or connected: a reader task is live.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

type ConnectHook = Arc<dyn Fn() + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&CoreError) + Send + Sync>;

#[derive(Default)]
struct Hooks {
    on_connect: Vec<ConnectHook>,
    on_error: Vec<ErrorHook>,
}

struct Reader {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

// ── EventHub ─────────────────────────────────────────────────────────

/// Multiplexed push-event connection.
///
/// Cheaply cloneable via `Arc<HubInner>`. Does not connect on creation;
/// call [`connect()`](Self::connect).
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    transport: Arc<dyn PushTransport>,
    target: String,
    state: watch::Sender<ConnectionState>,
    /// Bumped every time the connection opens.
    sessions: watch::Sender<u64>,
    registry: Mutex<SubscriptionRegistry>,
    reader: Mutex<Option<Reader>>,
    hooks: Mutex<Hooks>,
}

impl EventHub {
    pub fn new(transport: impl PushTransport) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    /// Hub reading Server-Sent Events from `{base}/events`.
    pub fn sse(client: ApiClient) -> Self {
        Self::new(SseTransport::new(client))
    }

    pub fn with_transport(transport: Arc<dyn PushTransport>) -> Self {
        let target = transport.describe();
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (sessions, _) = watch::channel(0);
        Self {
            inner: Arc::new(HubInner {
                transport,
                target,
                state,
                sessions,
                registry: Mutex::new(SubscriptionRegistry::new()),
                reader: Mutex::new(None),
                hooks: Mutex::new(Hooks::default()),
            }),
        }
    }

    /// What this hub connects to.
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Open the connection and start the reader task.
    ///
    /// No-op while already connecting or connected. Must be called from
    /// within a tokio runtime.
    pub fn connect(&self) {
        let started = self.inner.state.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            *state = ConnectionState::Connecting;
            true
        });
        if !started {
            debug!(endpoint = %self.inner.target, "connect ignored: already active");
            return;
        }

        info!(endpoint = %self.inner.target, "connecting to event stream");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reader_task(Arc::clone(&self.inner), cancel.clone()));

        let previous = lock(&self.inner.reader).replace(Reader { cancel, handle });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
    }

    /// Stop the reader task and return to [`Idle`](ConnectionState::Idle).
    ///
    /// No callbacks fire after this returns.
    pub fn close(&self) {
        if let Some(reader) = lock(&self.inner.reader).take() {
            reader.cancel.cancel();
            reader.handle.abort();
        }
        let previous = self.inner.state.send_replace(ConnectionState::Idle);
        if previous != ConnectionState::Idle {
            info!(endpoint = %self.inner.target, "event stream closed");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected()
    }

    /// Counter of opened connections; changes on every `Connected` transition.
    pub fn watch_sessions(&self) -> watch::Receiver<u64> {
        self.inner.sessions.subscribe()
    }

    /// Run `hook` every time the connection opens.
    pub fn on_connect(&self, hook: impl Fn() + Send + Sync + 'static) {
        lock(&self.inner.hooks).on_connect.push(Arc::new(hook));
    }

    /// Run `hook` every time the connection fails.
    pub fn on_error(&self, hook: impl Fn(&CoreError) + Send + Sync + 'static) {
        lock(&self.inner.hooks).on_error.push(Arc::new(hook));
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Register a subscription. Requires an open connection.
    pub fn subscribe(&self, sub: Subscription) -> Result<(), CoreError> {
        if !self.is_connected() {
            return Err(CoreError::NotConnected);
        }
        let event = sub.event.clone();
        let subscriber = sub.subscriber_id.clone();
        let provider = sub.provider.clone();
        if lock(&self.inner.registry).insert(sub) {
            debug!(%event, %subscriber, %provider, "first subscriber for event");
        }
        Ok(())
    }

    /// Remove every subscription held by `subscriber_id`.
    pub fn unsubscribe(&self, subscriber_id: &str) {
        let mut registry = lock(&self.inner.registry);
        let removed = registry.remove_subscriber(subscriber_id);
        if removed > 0 {
            debug!(subscriber = %subscriber_id, removed, idle = registry.is_empty(), "unsubscribed");
        }
    }

    pub fn subscription_count(&self) -> usize {
        lock(&self.inner.registry).len()
    }

    pub fn is_subscribed(&self, event: &str, subscriber_id: &str) -> bool {
        lock(&self.inner.registry).contains(event, subscriber_id)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("target", &self.inner.target)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

// ── Reader task ──────────────────────────────────────────────────────

async fn reader_task(inner: Arc<HubInner>, cancel: CancellationToken) {
    let mut frames = inner.transport.open();

    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = frames.next() => frame,
        };

        match frame {
            Some(Ok(StreamEvent::Open)) => {
                if !inner.publish(&cancel, ConnectionState::Connected) {
                    break;
                }
                info!(endpoint = %inner.target, "event stream connected");
                inner.sessions.send_modify(|n| *n += 1);
                let hooks = lock(&inner.hooks).on_connect.clone();
                for hook in hooks {
                    hook();
                }
            }
            Some(Ok(StreamEvent::Message(raw))) => {
                inner.dispatch(&cancel, &PushEvent::from(raw));
            }
            Some(Err(e)) => {
                inner.fail(&cancel, connection_error(&inner.target, e));
                break;
            }
            None => {
                inner.fail(&cancel, connection_error(&inner.target, mmp_api::Error::StreamEnded));
                break;
            }
        }
    }
}

impl HubInner {
    /// Publish a state unless the reader has been cancelled.
    ///
    /// The cancellation check runs under the watch lock, so a concurrent
    /// `close()` always has the last word.
    fn publish(&self, cancel: &CancellationToken, next: ConnectionState) -> bool {
        let mut published = false;
        self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = next;
            published = true;
            true
        });
        published
    }

    fn dispatch(&self, cancel: &CancellationToken, event: &PushEvent) {
        let callbacks = lock(&self.registry).callbacks_for(&event.name);
        if callbacks.is_empty() {
            debug!(event = %event.name, "no subscribers, dropping event");
            return;
        }
        if cancel.is_cancelled() {
            return;
        }
        dispatch::deliver(&callbacks, event);
    }

    fn fail(&self, cancel: &CancellationToken, err: CoreError) {
        if !self.publish(
            cancel,
            ConnectionState::Error {
                message: err.to_string(),
            },
        ) {
            return;
        }
        warn!(endpoint = %self.target, error = %err, "event stream failed");
        let hooks = lock(&self.hooks).on_error.clone();
        for hook in hooks {
            hook(&err);
        }
    }
}

fn connection_error(target: &str, err: mmp_api::Error) -> CoreError {
    match CoreError::from(err) {
        CoreError::ConnectionFailed { reason, .. } => CoreError::ConnectionFailed {
            url: target.to_owned(),
            reason,
        },
        other => other,
    }
}
