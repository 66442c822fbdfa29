// Subscriber-owned cumulative state.
//
// A watch follows the hub's connection: every time it becomes connected
// the accumulator is reset and the event names are re-subscribed. Each
// delivered patch is merged and the decoded value published.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Cumulative;
use crate::hub::EventHub;
use crate::lock;
use crate::subscription::{DEFAULT_PROVIDER, Subscription};

/// Live cumulative view over one or more events.
///
/// Dropping the watch (or calling [`stop`](Self::stop)) unsubscribes it.
pub struct CumulativeWatch<T> {
    hub: EventHub,
    subscriber_id: String,
    rx: watch::Receiver<T>,
    acc: Arc<Mutex<Cumulative<T>>>,
    cancel: CancellationToken,
}

impl<T> CumulativeWatch<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Start following `events` on `hub` as `subscriber_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<I, S>(hub: &EventHub, subscriber_id: impl Into<String>, events: I, initial: T) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::spawn_tagged(hub, subscriber_id, DEFAULT_PROVIDER, events, initial)
    }

    /// Like [`spawn`](Self::spawn), tagging every subscription with `provider`.
    pub fn spawn_tagged<I, S>(
        hub: &EventHub,
        subscriber_id: impl Into<String>,
        provider: impl Into<String>,
        events: I,
        initial: T,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subscriber_id = subscriber_id.into();
        let events: Vec<String> = events.into_iter().map(Into::into).collect();
        let (tx, rx) = watch::channel(initial.clone());
        let acc = Arc::new(Mutex::new(Cumulative::new(initial)));
        let cancel = CancellationToken::new();

        tokio::spawn(follow(
            Follow {
                hub: hub.clone(),
                subscriber_id: subscriber_id.clone(),
                provider: provider.into(),
                events,
            },
            Arc::clone(&acc),
            Arc::new(tx),
            cancel.clone(),
        ));

        Self {
            hub: hub.clone(),
            subscriber_id,
            rx,
            acc,
            cancel,
        }
    }

    /// Latest published value.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next published value. `None` once the watch has stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// A receiver for the published values.
    pub fn receiver(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }

    /// Patches merged since the last reset.
    ///
    /// Zero right after a connection opens, so a published value with no
    /// updates behind it is a reset rather than backend data.
    pub fn updates(&self) -> u64 {
        lock(&self.acc).updates()
    }

    pub fn stop(self) {}
}

impl<T> Drop for CumulativeWatch<T> {
    fn drop(&mut self) {
        // The follow task unsubscribes again on exit.
        self.cancel.cancel();
        self.hub.unsubscribe(&self.subscriber_id);
    }
}

struct Follow {
    hub: EventHub,
    subscriber_id: String,
    provider: String,
    events: Vec<String>,
}

async fn follow<T>(
    target: Follow,
    acc: Arc<Mutex<Cumulative<T>>>,
    tx: Arc<watch::Sender<T>>,
    cancel: CancellationToken,
) where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let Follow {
        hub,
        subscriber_id,
        provider,
        events,
    } = target;
    let mut sessions = hub.watch_sessions();
    if hub.is_connected() {
        sessions.mark_changed();
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            opened = sessions.changed() => {
                if opened.is_err() {
                    break;
                }
            }
        }

        lock(&acc).reset();
        for event in &events {
            if cancel.is_cancelled() {
                break;
            }
            let acc = Arc::clone(&acc);
            let tx = Arc::clone(&tx);
            let sub = Subscription::new(subscriber_id.as_str(), event.as_str(), move |evt| {
                let mut acc = lock(&acc);
                acc.apply(&evt.state);
                tx.send_replace(acc.value());
            })
            .with_provider(provider.as_str());
            if let Err(e) = hub.subscribe(sub) {
                warn!(subscriber = %subscriber_id, %event, error = %e, "subscription failed");
            }
        }
        // Dropped mid-subscribe: undo below.
        if cancel.is_cancelled() {
            break;
        }
        let value = lock(&acc).value();
        tx.send_replace(value);
        debug!(subscriber = %subscriber_id, %provider, events = events.len(), "cumulative watch subscribed");
    }

    hub.unsubscribe(&subscriber_id);
}
