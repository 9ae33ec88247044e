use leadvault_core::{format_rfc3339, now_utc, LeadError};
use serde::Serialize;

use crate::telemetry::{ServiceTelemetry, ServiceTelemetrySnapshot};

pub const OPERATIONAL: &str = "OPERATIONAL";

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub timestamp: String,
    pub telemetry: ServiceTelemetrySnapshot,
}

/// Reports liveness without touching the lead store.
///
/// # Errors
/// Returns [`LeadError::Time`] if the current time cannot be formatted.
pub fn status_report(telemetry: &ServiceTelemetry) -> Result<StatusReport, LeadError> {
    Ok(StatusReport {
        status: OPERATIONAL,
        timestamp: format_rfc3339(now_utc())?,
        telemetry: telemetry.snapshot(),
    })
}
