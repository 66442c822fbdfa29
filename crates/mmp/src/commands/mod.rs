//! Command handlers and the shared runtime context they receive.

pub mod config_cmd;
pub mod events;
pub mod printer;
pub mod status;
pub mod tree;

use std::time::Duration;

use mmp_config::Config;
use mmp_core::{BackendConfig, ConnectionState, EventHub, ToastLimits, TreeConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Resolved configuration for commands that talk to the backend.
#[derive(Debug, Clone)]
pub struct Context {
    pub backend: BackendConfig,
    pub tree: TreeConfig,
    pub toasts: ToastLimits,
    pub color: bool,
}

impl Context {
    /// Load the config file and apply CLI flag overrides.
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = apply_overrides(mmp_config::load_config()?, global);
        Ok(Self {
            backend: cfg.backend_config()?,
            tree: cfg.tree_config()?,
            toasts: cfg.toast_limits()?,
            color: output::should_color(global.color),
        })
    }
}

/// Layer `--backend`, `--timeout` and `--insecure` over the file config.
pub fn apply_overrides(mut cfg: Config, global: &GlobalOpts) -> Config {
    if let Some(ref url) = global.backend {
        cfg.backend.url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.backend.timeout = timeout;
    }
    if global.insecure {
        cfg.backend.insecure = true;
    }
    cfg
}

/// Route a backend command to its handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Events(args) => events::handle(args, ctx, global).await,
        Command::Printer(args) => printer::handle(args, ctx, global).await,
        Command::Tree(args) => tree::handle(args, ctx, global).await,
        Command::Status => status::handle(ctx, global).await,
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Connect `hub` to `ctx`'s backend and wait until the stream opens.
pub(crate) async fn connect_hub(ctx: &Context) -> Result<EventHub, CliError> {
    let hub = EventHub::sse(ctx.backend.api_client()?);
    hub.connect();

    match settle(&hub, ctx.backend.timeout).await {
        Some(ConnectionState::Connected) => Ok(hub),
        Some(ConnectionState::Error { message }) => Err(CliError::ConnectionFailed {
            url: hub.target().to_owned(),
            reason: message,
        }),
        _ => Err(CliError::Timeout {
            seconds: ctx.backend.timeout.as_secs(),
        }),
    }
}

/// Wait for the hub to leave `Idle`/`Connecting`. `None` on timeout.
pub(crate) async fn settle(hub: &EventHub, timeout: Duration) -> Option<ConnectionState> {
    let mut state = hub.watch_state();
    let settled = tokio::time::timeout(
        timeout,
        state.wait_for(|s| s.is_connected() || s.error().is_some()),
    )
    .await;
    match settled {
        Ok(Ok(state)) => Some(state.clone()),
        _ => None,
    }
}

/// Resolve once the hub reports an error; yields its message.
pub(crate) async fn connection_lost(hub: &EventHub) -> String {
    let mut state = hub.watch_state();
    match state.wait_for(|s| s.error().is_some()).await {
        Ok(s) => s.error().unwrap_or_default().to_owned(),
        Err(_) => "event hub closed".to_owned(),
    }
}

/// Whether `seen` updates satisfy `--count`.
pub(crate) fn reached(seen: usize, count: Option<usize>) -> bool {
    count.is_some_and(|limit| seen >= limit)
}
