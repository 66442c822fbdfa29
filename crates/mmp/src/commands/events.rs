//! `mmp events`: follow the cumulative state of arbitrary events.

use serde::Serialize;
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::WatchStream;

use mmp_core::{CumulativeWatch, EventHub, Patch};

use super::{Context, connect_hub, connection_lost, reached};
use crate::cli::{EventsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct EventLine<'a> {
    event: &'a str,
    state: &'a Patch,
}

pub async fn handle(args: EventsArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let hub = connect_hub(ctx).await?;

    let result = follow(&hub, &args.events, args.count, |event, state| {
        let line = EventLine { event, state };
        let rendered = output::render_single(global.output, &line, |l| {
            format!(
                "{} {}",
                output::dim(l.event, ctx.color),
                serde_json::Value::Object(l.state.clone())
            )
        })?;
        output::print_output(&rendered, global.quiet);
        Ok(())
    })
    .await;

    hub.close();
    result
}

/// Hand every update of `names` to `emit` until `count` is reached.
async fn follow<F>(
    hub: &EventHub,
    names: &[String],
    count: Option<usize>,
    mut emit: F,
) -> Result<(), CliError>
where
    F: FnMut(&str, &Patch) -> Result<(), CliError>,
{
    // One watch per event so every name keeps its own accumulator.
    let watches: Vec<CumulativeWatch<Patch>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            CumulativeWatch::spawn(hub, format!("mmp-events-{i}"), [name.as_str()], Patch::new())
        })
        .collect();

    let mut updates = StreamMap::new();
    for (i, watch) in watches.iter().enumerate() {
        updates.insert(i, WatchStream::from_changes(watch.receiver()));
    }

    let lost = connection_lost(hub);
    tokio::pin!(lost);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0usize;
    while !reached(seen, count) {
        tokio::select! {
            _ = &mut ctrl_c => break,
            reason = &mut lost => {
                return Err(CliError::ConnectionFailed {
                    url: hub.target().to_owned(),
                    reason,
                });
            }
            update = updates.next() => {
                let Some((i, state)) = update else { break };
                // Session resets republish the initial accumulator.
                if watches[i].updates() == 0 {
                    continue;
                }
                emit(&names[i], &state)?;
                seen += 1;
            }
        }
    }
    Ok(())
}
