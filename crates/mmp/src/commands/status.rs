//! `mmp status`: open the push connection once and report how it went.

use serde::Serialize;

use mmp_core::{ConnectionStatus, HubProvider, Indicator};

use super::{Context, settle};
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Report<'a> {
    backend: &'a str,
    indicator: &'a str,
    #[serde(flatten)]
    status: &'a ConnectionStatus,
}

fn plain(report: &Report<'_>, color: bool) -> String {
    let healthy = report.status.indicator() == Indicator::Connected;
    let text = match report.status.error {
        Some(ref message) => format!("{}: {message}", report.indicator),
        None => report.indicator.to_owned(),
    };
    format!(
        "{} {}",
        output::paint_indicator(&text, healthy, color),
        output::dim(report.backend, color)
    )
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let provider = HubProvider::sse(ctx.backend.transport());
    provider.set_backend(Some(ctx.backend.url.clone()))?;

    if let Some(hub) = provider.hub() {
        settle(&hub, ctx.backend.timeout).await;
    }
    let status = provider.status();
    let indicator = status.indicator();
    let backend = ctx.backend.url.as_str();

    let report = Report {
        backend,
        indicator: indicator.as_ref(),
        status: &status,
    };
    let rendered = output::render_single(global.output, &report, |r| plain(r, ctx.color))?;
    output::print_output(&rendered, global.quiet);
    provider.set_backend(None)?;

    match indicator {
        Indicator::Connected => Ok(()),
        Indicator::Loading => Err(CliError::Timeout {
            seconds: ctx.backend.timeout.as_secs(),
        }),
        Indicator::Failed | Indicator::Offline => Err(CliError::ConnectionFailed {
            url: backend.to_owned(),
            reason: status.error.unwrap_or_else(|| "not connected".into()),
        }),
    }
}
