// Typed views over printer update payloads.
//
// The backend sends partial objects; every field defaults so a view can
// be decoded from whatever has been accumulated so far.

use serde::{Deserialize, Serialize};

/// Heater reading, sent on `printer.update.<uuid>.bed` and `.extruder`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thermal {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// Print job progress, sent on `printer.update.<uuid>.job_status`.
///
/// `progress` is a fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobStatus {
    /// Progress as a whole percentage, clamped to `0..=100`.
    pub fn percent(&self) -> u8 {
        let pct = (self.progress * 100.0).round().clamp(0.0, 100.0);
        // Clamped above, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = pct as u8;
        pct
    }
}
