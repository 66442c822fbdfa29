// mmp-core: Push-event multiplexing, lazy asset tree and error surfacing for mmp clients.

pub mod config;
pub mod error;
pub mod event;
pub mod hub;
pub mod notify;
pub mod provider;
pub mod subscription;
pub mod transport;
pub mod tree;

mod dispatch;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BackendConfig, TlsVerification, TreeConfig};
pub use error::CoreError;
pub use event::{
    Cumulative, CumulativeWatch, JobStatus, Patch, PrinterMetric, PushEvent, Thermal, Topic,
};
pub use hub::{ConnectionState, EventHub};
pub use notify::{ErrorConfig, ErrorReporter, Severity, Toast, ToastLimits, Toaster};
pub use provider::{ConnectionStatus, HubProvider, Indicator};
pub use subscription::{Callback, Subscription, SubscriptionRegistry};
pub use transport::{PushTransport, SseTransport};
pub use tree::{AssetSource, AssetTree, NodeIcon, ROOT_ID, TreeNode};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
