// Toast deduplication and rate limiting.
//
// `ToastGate` is the pure state machine: it takes the current instant as
// an argument so it can be driven deterministically. `Toaster` wraps it
// with a clock, a sink and the periodic sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::lock;

pub const MAX_CACHE_SIZE: usize = 100;
pub const TOAST_DEDUP_WINDOW: Duration = Duration::from_millis(2000);
pub const MAX_TOASTS_PER_WINDOW: u32 = 5;
pub const MAX_QUEUE_DEPTH: u32 = 20;
pub const CLEANUP_INTERVAL: Duration = Duration::from_millis(5000);

/// Tunables for the toast gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastLimits {
    pub max_cache_size: usize,
    pub dedup_window: Duration,
    pub max_per_window: u32,
    pub max_queue_depth: u32,
    pub cleanup_interval: Duration,
}

impl Default for ToastLimits {
    fn default() -> Self {
        Self {
            max_cache_size: MAX_CACHE_SIZE,
            dedup_window: TOAST_DEDUP_WINDOW,
            max_per_window: MAX_TOASTS_PER_WINDOW,
            max_queue_depth: MAX_QUEUE_DEPTH,
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

/// An error notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub duration: Duration,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>, duration: Duration) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            duration,
        }
    }

    /// Identity used for deduplication.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.title, self.description)
    }
}

/// Why a toast was not shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Suppressed {
    QueueFull,
    RateLimited,
    Duplicate,
}

// ── ToastGate ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ToastGate {
    limits: ToastLimits,
    cache: HashMap<String, Instant>,
    window_count: u32,
    last_reset: Instant,
    queue_depth: u32,
}

impl ToastGate {
    pub fn new(limits: ToastLimits, now: Instant) -> Self {
        Self {
            limits,
            cache: HashMap::new(),
            window_count: 0,
            last_reset: now,
            queue_depth: 0,
        }
    }

    /// Decide whether `toast` may be shown at `now`, recording it if so.
    pub fn show_error_toast(&mut self, toast: &Toast, now: Instant) -> Result<(), Suppressed> {
        self.roll_window(now);

        if self.queue_depth >= self.limits.max_queue_depth {
            return Err(Suppressed::QueueFull);
        }
        if self.window_count >= self.limits.max_per_window {
            return Err(Suppressed::RateLimited);
        }

        let key = toast.cache_key();
        if let Some(seen) = self.cache.get(&key) {
            if now.saturating_duration_since(*seen) < self.limits.dedup_window {
                return Err(Suppressed::Duplicate);
            }
        }

        self.cache.insert(key, now);
        self.window_count += 1;
        self.queue_depth += 1;
        Ok(())
    }

    /// A shown toast went away.
    pub fn dismiss(&mut self) {
        self.queue_depth = self.queue_depth.saturating_sub(1);
    }

    /// Drop stale cache entries, or the oldest ones if over capacity.
    pub fn sweep(&mut self, now: Instant) {
        self.roll_window(now);

        if self.cache.len() > self.limits.max_cache_size {
            let mut entries: Vec<(String, Instant)> = self.cache.drain().collect();
            entries.sort_by_key(|(_, at)| *at);
            let excess = entries.len() - self.limits.max_cache_size;
            self.cache = entries.into_iter().skip(excess).collect();
        } else {
            let window = self.limits.dedup_window;
            self.cache
                .retain(|_, at| now.saturating_duration_since(*at) <= window);
        }
    }

    pub fn queue_depth(&self) -> u32 {
        self.queue_depth
    }

    pub fn window_count(&self) -> u32 {
        self.window_count
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn limits(&self) -> &ToastLimits {
        &self.limits
    }

    fn roll_window(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_reset) > self.limits.dedup_window {
            self.window_count = 0;
            self.last_reset = now;
        }
    }
}

// ── Sinks ────────────────────────────────────────────────────────────

/// Where accepted toasts go.
pub trait ToastSink: Send + Sync {
    fn show(&self, toast: &Toast);
}

/// Emits toasts as log records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ToastSink for TracingSink {
    fn show(&self, toast: &Toast) {
        warn!(
            title = %toast.title,
            duration_ms = u64::try_from(toast.duration.as_millis()).unwrap_or(u64::MAX),
            "{}",
            toast.description
        );
    }
}

// ── Toaster ──────────────────────────────────────────────────────────

/// Gate plus sink, on the tokio clock.
///
/// Shown toasts are dismissed automatically after their duration when a
/// tokio runtime is available.
pub struct Toaster {
    gate: Arc<Mutex<ToastGate>>,
    sink: Arc<dyn ToastSink>,
}

impl Toaster {
    pub fn new(limits: ToastLimits) -> Self {
        Self::with_sink(limits, Arc::new(TracingSink))
    }

    pub fn with_sink(limits: ToastLimits, sink: Arc<dyn ToastSink>) -> Self {
        Self {
            gate: Arc::new(Mutex::new(ToastGate::new(limits, Instant::now()))),
            sink,
        }
    }

    /// Show `toast` unless the gate suppresses it. Returns whether it was shown.
    pub fn show_error_toast(&self, toast: &Toast) -> bool {
        if let Err(reason) = lock(&self.gate).show_error_toast(toast, Instant::now()) {
            debug!(title = %toast.title, %reason, "toast suppressed");
            return false;
        }

        self.sink.show(toast);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let gate = Arc::clone(&self.gate);
            let duration = toast.duration;
            handle.spawn(async move {
                tokio::time::sleep(duration).await;
                lock(&gate).dismiss();
            });
        }
        true
    }

    pub fn dismiss(&self) {
        lock(&self.gate).dismiss();
    }

    pub fn sweep(&self) {
        lock(&self.gate).sweep(Instant::now());
    }

    pub fn queue_depth(&self) -> u32 {
        lock(&self.gate).queue_depth()
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.gate).cache_len()
    }

    /// Run [`sweep`](Self::sweep) every cleanup interval until `cancel` fires.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let gate = Arc::clone(&self.gate);
        let period = lock(&gate)
            .limits()
            .cleanup_interval
            .max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => lock(&gate).sweep(Instant::now()),
                }
            }
        })
    }
}
