// ── Typed push events ──
//
// Event names are dotted paths. The two families the backend emits are
// decoded into a tagged `Topic` at the dispatch boundary so consumers
// never re-parse strings:
//
//   system.state.<domain>.<kind>      e.g. system.state.asset.event
//   printer.update.<uuid>.<metric>    e.g. printer.update.42.bed

mod cumulative;
mod payload;
mod watch;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use mmp_api::RawEvent;

pub use cumulative::Cumulative;
pub use payload::{JobStatus, Thermal};
pub use watch::CumulativeWatch;

/// A partial state update: shallow-merged into a subscriber's accumulator.
pub type Patch = serde_json::Map<String, serde_json::Value>;

// ── Well-known event names ───────────────────────────────────────────

pub const PROJECT_EVENT: &str = "system.state.project.event";
pub const ASSET_EVENT: &str = "system.state.asset.event";
pub const TEMPFILE_NEW: &str = "system.state.tempfile.new";

/// `printer.update.<printer>.<metric>`
pub fn printer_event(printer: &str, metric: &PrinterMetric) -> String {
    format!("printer.update.{printer}.{metric}")
}

/// `system.state.<domain>.<kind>`
pub fn system_event(domain: &str, kind: &str) -> String {
    format!("system.state.{domain}.{kind}")
}

// ── PrinterMetric ────────────────────────────────────────────────────

/// Which reading a `printer.update.*` event carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PrinterMetric {
    Bed,
    Extruder,
    JobStatus,
    #[strum(default)]
    Other(String),
}

impl PrinterMetric {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bed => "bed",
            Self::Extruder => "extruder",
            Self::JobStatus => "job_status",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for PrinterMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Topic ────────────────────────────────────────────────────────────

/// Decoded event family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    SystemState { domain: String, kind: String },
    PrinterUpdate { printer: String, metric: PrinterMetric },
    Other,
}

impl Topic {
    pub fn parse(name: &str) -> Self {
        let parts: Vec<&str> = name.split('.').collect();
        match parts.as_slice() {
            ["system", "state", domain, rest @ ..] if !rest.is_empty() => Self::SystemState {
                domain: (*domain).to_string(),
                kind: rest.join("."),
            },
            ["printer", "update", printer, rest @ ..] if !rest.is_empty() => {
                let metric = rest.join(".");
                Self::PrinterUpdate {
                    printer: (*printer).to_string(),
                    metric: metric
                        .parse()
                        .unwrap_or(PrinterMetric::Other(metric)),
                }
            }
            _ => Self::Other,
        }
    }
}

// ── PushEvent ────────────────────────────────────────────────────────

/// An event as delivered to subscriber callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushEvent {
    pub name: String,
    #[serde(skip)]
    pub topic: Topic,
    pub state: Patch,
    pub received_at: DateTime<Utc>,
}

impl PushEvent {
    pub fn new(name: impl Into<String>, state: Patch) -> Self {
        let name = name.into();
        Self {
            topic: Topic::parse(&name),
            name,
            state,
            received_at: Utc::now(),
        }
    }
}

impl From<RawEvent> for PushEvent {
    fn from(raw: RawEvent) -> Self {
        let state = match raw.state {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = Patch::new();
                map.insert("value".into(), other);
                map
            }
        };
        Self {
            topic: Topic::parse(&raw.event),
            name: raw.event,
            state,
            received_at: raw.received_at,
        }
    }
}
