// Front door for surfacing errors: classify, log, toast.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::error;

use super::classify::ErrorConfig;
use super::toast::{Toast, Toaster};
use crate::error::CoreError;

/// Routes API errors to the log and the toaster.
pub struct ErrorReporter {
    toaster: Arc<Toaster>,
    offline: AtomicBool,
}

impl ErrorReporter {
    pub fn new(toaster: Arc<Toaster>) -> Self {
        Self {
            toaster,
            offline: AtomicBool::new(false),
        }
    }

    pub fn toaster(&self) -> &Arc<Toaster> {
        &self.toaster
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }

    /// Classify `err` and surface it. Silent errors are swallowed.
    pub fn report(&self, err: &CoreError) -> ErrorConfig {
        let config = ErrorConfig::for_error(err, self.is_offline());
        if config.is_silent() {
            return config;
        }

        error!(
            status = err.status(),
            title = %config.title,
            retryable = config.retryable,
            error = %err,
            "API error"
        );
        self.toaster.show_error_toast(&Toast::new(
            config.title.clone(),
            config.description.clone(),
            config.duration,
        ));
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::toast::{ToastLimits, ToastSink};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Toast>>);

    impl ToastSink for Recording {
        fn show(&self, toast: &Toast) {
            self.0.lock().unwrap().push(toast.clone());
        }
    }

    fn reporter() -> (ErrorReporter, Arc<Recording>) {
        let sink = Arc::new(Recording::default());
        let toaster = Toaster::with_sink(ToastLimits::default(), Arc::clone(&sink) as Arc<dyn ToastSink>);
        (ErrorReporter::new(Arc::new(toaster)), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn toast_errors_reach_sink_once() {
        let (reporter, sink) = reporter();
        let err = CoreError::Api {
            status: 503,
            message: None,
        };
        reporter.report(&err);
        reporter.report(&err);

        let shown = sink.0.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Service Unavailable");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_errors_are_swallowed() {
        let (reporter, sink) = reporter();
        let cfg = reporter.report(&CoreError::Cancelled);
        assert!(cfg.is_silent());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn offline_flag_changes_title() {
        let (reporter, sink) = reporter();
        reporter.set_offline(true);
        reporter.report(&CoreError::Unreachable {
            reason: "dns".into(),
        });
        assert_eq!(sink.0.lock().unwrap()[0].title, "Offline");
    }
}
