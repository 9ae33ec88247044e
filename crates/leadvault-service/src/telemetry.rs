use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
#[allow(clippy::struct_field_names)]
pub struct ServiceTelemetry {
    requests_total: AtomicU64,
    requests_success_total: AtomicU64,
    requests_failure_total: AtomicU64,
    invalid_json_total: AtomicU64,
    invalid_payload_total: AtomicU64,
    persistence_failed_total: AtomicU64,
    internal_error_total: AtomicU64,
    other_error_total: AtomicU64,
    relay_delivered_total: AtomicU64,
    relay_failed_total: AtomicU64,
    relay_dropped_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[allow(clippy::struct_field_names)]
pub struct ServiceTelemetrySnapshot {
    pub requests_total: u64,
    pub requests_success_total: u64,
    pub requests_failure_total: u64,
    pub invalid_json_total: u64,
    pub invalid_payload_total: u64,
    pub persistence_failed_total: u64,
    pub internal_error_total: u64,
    pub other_error_total: u64,
    pub relay_delivered_total: u64,
    pub relay_failed_total: u64,
    pub relay_dropped_total: u64,
}

impl ServiceTelemetry {
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.requests_success_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, code: &str) {
        self.requests_failure_total.fetch_add(1, Ordering::Relaxed);
        match code {
            "invalid_json" => {
                self.invalid_json_total.fetch_add(1, Ordering::Relaxed);
            }
            "invalid_payload" => {
                self.invalid_payload_total.fetch_add(1, Ordering::Relaxed);
            }
            "persistence_failed" => {
                self.persistence_failed_total.fetch_add(1, Ordering::Relaxed);
            }
            "internal_error" => {
                self.internal_error_total.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.other_error_total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_relay_delivered(&self) {
        self.relay_delivered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_failed(&self) {
        self.relay_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_dropped(&self) {
        self.relay_dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> ServiceTelemetrySnapshot {
        ServiceTelemetrySnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success_total: self.requests_success_total.load(Ordering::Relaxed),
            requests_failure_total: self.requests_failure_total.load(Ordering::Relaxed),
            invalid_json_total: self.invalid_json_total.load(Ordering::Relaxed),
            invalid_payload_total: self.invalid_payload_total.load(Ordering::Relaxed),
            persistence_failed_total: self.persistence_failed_total.load(Ordering::Relaxed),
            internal_error_total: self.internal_error_total.load(Ordering::Relaxed),
            other_error_total: self.other_error_total.load(Ordering::Relaxed),
            relay_delivered_total: self.relay_delivered_total.load(Ordering::Relaxed),
            relay_failed_total: self.relay_failed_total.load(Ordering::Relaxed),
            relay_dropped_total: self.relay_dropped_total.load(Ordering::Relaxed),
        }
    }
}
