//! `mmp printer`: live bed, extruder, and job readings for one printer.

use serde::Serialize;

use mmp_core::event::printer_event;
use mmp_core::{CumulativeWatch, EventHub, JobStatus, PrinterMetric, Thermal};

use super::{Context, connect_hub, connection_lost, reached};
use crate::cli::{GlobalOpts, PrinterArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    printer: &'a str,
    bed: Thermal,
    extruder: Thermal,
    job: JobStatus,
}

fn thermal_line(label: &str, t: &Thermal) -> String {
    match t.target {
        Some(target) => format!("{label} {:.1}/{target:.1}°C", t.temperature),
        None => format!("{label} {:.1}°C", t.temperature),
    }
}

fn plain(s: &Snapshot<'_>) -> String {
    let mut line = format!(
        "{}  {}  job {}%",
        thermal_line("bed", &s.bed),
        thermal_line("extruder", &s.extruder),
        s.job.percent()
    );
    if let Some(ref file) = s.job.file_name {
        line.push(' ');
        line.push_str(file);
    }
    if let Some(ref message) = s.job.message {
        line.push_str(&format!(" ({message})"));
    }
    line
}

pub async fn handle(args: PrinterArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let hub = connect_hub(ctx).await?;

    let result = follow(&hub, &args.uuid, args.count, |snapshot| {
        let rendered = output::render_single(global.output, snapshot, plain)?;
        output::print_output(&rendered, global.quiet);
        Ok(())
    })
    .await;

    hub.close();
    result
}

/// Hand a snapshot to `emit` on every reading until `count` is reached.
async fn follow<F>(
    hub: &EventHub,
    uuid: &str,
    count: Option<usize>,
    mut emit: F,
) -> Result<(), CliError>
where
    F: FnMut(&Snapshot<'_>) -> Result<(), CliError>,
{
    let provider = format!("printers/{uuid}");
    let watch_id = |metric: &PrinterMetric| format!("mmp-printer-{uuid}-{metric}");
    let mut bed = CumulativeWatch::spawn_tagged(
        hub,
        watch_id(&PrinterMetric::Bed),
        provider.as_str(),
        [printer_event(uuid, &PrinterMetric::Bed)],
        Thermal::default(),
    );
    let mut extruder = CumulativeWatch::spawn_tagged(
        hub,
        watch_id(&PrinterMetric::Extruder),
        provider.as_str(),
        [printer_event(uuid, &PrinterMetric::Extruder)],
        Thermal::default(),
    );
    let mut job = CumulativeWatch::spawn_tagged(
        hub,
        watch_id(&PrinterMetric::JobStatus),
        provider.as_str(),
        [printer_event(uuid, &PrinterMetric::JobStatus)],
        JobStatus::default(),
    );

    let lost = connection_lost(hub);
    tokio::pin!(lost);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0usize;
    while !reached(seen, count) {
        let fresh = tokio::select! {
            _ = &mut ctrl_c => break,
            reason = &mut lost => {
                return Err(CliError::ConnectionFailed {
                    url: hub.target().to_owned(),
                    reason,
                });
            }
            Some(_) = bed.changed() => bed.updates() > 0,
            Some(_) = extruder.changed() => extruder.updates() > 0,
            Some(_) = job.changed() => job.updates() > 0,
            else => break,
        };
        // Session resets republish the initial readings.
        if !fresh {
            continue;
        }

        emit(&Snapshot {
            printer: uuid,
            bed: bed.current(),
            extruder: extruder.current(),
            job: job.current(),
        })?;
        seen += 1;
    }

    bed.stop();
    extruder.stop();
    job.stop();
    Ok(())
}
