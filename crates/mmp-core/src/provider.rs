// ── Hub provider ──
//
// Binds at most one EventHub to the current backend URL. Changing the URL
// tears the old hub down before the new one connects.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use tracing::info;
use url::Url;

use crate::error::CoreError;
use crate::hub::{ConnectionState, EventHub};
use crate::lock;
use crate::subscription::Subscription;
use crate::transport::PushTransport;

/// Creates the transport for a backend URL.
pub type TransportFactory =
    Arc<dyn Fn(&Url) -> Result<Arc<dyn PushTransport>, CoreError> + Send + Sync>;

struct Bound {
    url: Url,
    hub: EventHub,
}

/// Owner of the hub for the configured backend.
///
/// Reads go through the `ArcSwap`; rebinding is serialized by `rebind`.
pub struct HubProvider {
    factory: TransportFactory,
    current: ArcSwapOption<Bound>,
    rebind: Mutex<()>,
}

/// What a status indicator renders.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Indicator {
    Loading,
    Connected,
    Failed,
    Offline,
}

impl ConnectionStatus {
    pub fn from_state(state: &ConnectionState) -> Self {
        match state {
            ConnectionState::Idle => Self::default(),
            ConnectionState::Connecting => Self {
                loading: true,
                ..Self::default()
            },
            ConnectionState::Connected => Self {
                connected: true,
                ..Self::default()
            },
            ConnectionState::Error { message } => Self {
                error: Some(message.clone()),
                ..Self::default()
            },
        }
    }

    pub fn indicator(&self) -> Indicator {
        if self.loading {
            Indicator::Loading
        } else if self.connected {
            Indicator::Connected
        } else if self.error.is_some() {
            Indicator::Failed
        } else {
            Indicator::Offline
        }
    }
}

impl HubProvider {
    /// Provider whose hubs read Server-Sent Events from each backend URL.
    pub fn sse(transport: mmp_api::TransportConfig) -> Self {
        Self::new(Arc::new(move |url: &Url| -> Result<Arc<dyn PushTransport>, CoreError> {
            let client = mmp_api::ApiClient::new(url.clone(), &transport)?;
            Ok(Arc::new(crate::transport::SseTransport::new(client)) as Arc<dyn PushTransport>)
        }))
    }

    pub fn new(factory: TransportFactory) -> Self {
        Self {
            factory,
            current: ArcSwapOption::empty(),
            rebind: Mutex::new(()),
        }
    }

    /// Point the provider at `url`, or at nothing.
    ///
    /// The same URL is a no-op. A different URL closes the current hub
    /// first, then creates and connects a new one.
    pub fn set_backend(&self, url: Option<Url>) -> Result<(), CoreError> {
        let _rebind = lock(&self.rebind);
        let current = self.current.load_full();
        if current.as_ref().map(|b| &b.url) == url.as_ref() {
            return Ok(());
        }

        if let Some(old) = current {
            info!(url = %old.url, "closing event hub");
            old.hub.close();
        }
        self.current.store(None);

        let Some(url) = url else {
            return Ok(());
        };
        let transport = (self.factory)(&url)?;
        let hub = EventHub::with_transport(transport);
        hub.connect();
        info!(url = %url, "event hub bound to backend");
        self.current.store(Some(Arc::new(Bound { url, hub })));
        Ok(())
    }

    pub fn backend(&self) -> Option<Url> {
        self.current.load_full().map(|b| b.url.clone())
    }

    pub fn hub(&self) -> Option<EventHub> {
        self.current.load_full().map(|b| b.hub.clone())
    }

    /// Subscribe on the current hub. Resolves `Ok` when there is none.
    pub fn subscribe(&self, sub: Subscription) -> Result<(), CoreError> {
        match self.hub() {
            Some(hub) => hub.subscribe(sub),
            None => Ok(()),
        }
    }

    pub fn unsubscribe(&self, subscriber_id: &str) {
        if let Some(hub) = self.hub() {
            hub.unsubscribe(subscriber_id);
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.hub()
            .map(|hub| ConnectionStatus::from_state(&hub.state()))
            .unwrap_or_default()
    }
}

impl Drop for HubProvider {
    fn drop(&mut self) {
        if let Some(bound) = self.current.swap(None) {
            bound.hub.close();
        }
    }
}
