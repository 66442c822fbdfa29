// ── Error notifications ──
//
// Classification of errors into user-facing toasts, with deduplication
// and rate limiting in front of the sink.

mod classify;
mod reporter;
mod toast;

pub use classify::{ErrorConfig, Severity};
pub use reporter::ErrorReporter;
pub use toast::{
    CLEANUP_INTERVAL, MAX_CACHE_SIZE, MAX_QUEUE_DEPTH, MAX_TOASTS_PER_WINDOW, Suppressed,
    TOAST_DEDUP_WINDOW, Toast, ToastGate, ToastLimits, ToastSink, Toaster, TracingSink,
};
