//! Detached relay notifier.
//!
//! Persisted leads are pushed onto a bounded queue; one worker task drains it
//! and hands each lead to the [`RelayTarget`] on the blocking pool. Nothing
//! flows back to the request that enqueued the lead.

use std::sync::Arc;

use leadvault_core::Lead;
use leadvault_relay::RelayTarget;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::telemetry::ServiceTelemetry;

pub const DEFAULT_RELAY_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct RelayHandle {
    sender: mpsc::Sender<Lead>,
    telemetry: Arc<ServiceTelemetry>,
}

impl RelayHandle {
    /// Queues `lead` for a single delivery attempt. Never blocks; a full or
    /// closed queue drops the notification.
    pub fn notify(&self, lead: Lead) {
        match self.sender.try_send(lead) {
            Ok(()) => {}
            Err(TrySendError::Full(lead)) => {
                self.telemetry.record_relay_dropped();
                tracing::warn!(lead_id = %lead.lead_id, "relay queue full; notification dropped");
            }
            Err(TrySendError::Closed(lead)) => {
                self.telemetry.record_relay_dropped();
                tracing::warn!(lead_id = %lead.lead_id, "relay dispatcher stopped; notification dropped");
            }
        }
    }
}

/// Spawns the relay worker on the current runtime.
///
/// The worker exits once every [`RelayHandle`] clone is dropped and the queue
/// has been drained.
#[must_use]
pub fn spawn_dispatcher(
    relay: Arc<dyn RelayTarget>,
    capacity: usize,
    telemetry: Arc<ServiceTelemetry>,
) -> (RelayHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let worker = tokio::spawn(run_dispatcher(relay, receiver, Arc::clone(&telemetry)));
    (RelayHandle { sender, telemetry }, worker)
}

async fn run_dispatcher(
    relay: Arc<dyn RelayTarget>,
    mut receiver: mpsc::Receiver<Lead>,
    telemetry: Arc<ServiceTelemetry>,
) {
    while let Some(lead) = receiver.recv().await {
        let lead_id = lead.lead_id.clone();
        let target = Arc::clone(&relay);
        let outcome = tokio::task::spawn_blocking(move || target.deliver(&lead)).await;

        match outcome {
            Ok(Ok(receipt)) => {
                telemetry.record_relay_delivered();
                tracing::info!(
                    %lead_id,
                    relay = relay.name(),
                    status_code = receipt.status_code,
                    latency_ms = receipt.latency_ms,
                    "relay delivery confirmed"
                );
            }
            Ok(Err(err)) => {
                telemetry.record_relay_failed();
                tracing::warn!(%lead_id, relay = relay.name(), error = %err, "relay delivery failed");
            }
            Err(err) => {
                telemetry.record_relay_failed();
                tracing::warn!(%lead_id, relay = relay.name(), error = %err, "relay worker join failure");
            }
        }
    }

    tracing::debug!("relay dispatcher drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadvault_core::{now_utc, LeadId, LeadSubmission};
    use leadvault_relay::{RelayError, RelayReceipt};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct RecordingRelay {
        delivered: Mutex<Vec<LeadId>>,
    }

    impl RelayTarget for RecordingRelay {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn deliver(&self, lead: &Lead) -> Result<RelayReceipt, RelayError> {
            match self.delivered.lock() {
                Ok(mut delivered) => delivered.push(lead.lead_id.clone()),
                Err(_) => return Err(RelayError::Transport("poisoned".to_string())),
            }
            Ok(RelayReceipt { status_code: 200, latency_ms: 0 })
        }
    }

    #[derive(Debug)]
    struct SlowFailingRelay;

    impl RelayTarget for SlowFailingRelay {
        fn name(&self) -> &'static str {
            "slow_failing"
        }

        fn deliver(&self, _lead: &Lead) -> Result<RelayReceipt, RelayError> {
            std::thread::sleep(Duration::from_millis(50));
            Err(RelayError::Status(503))
        }
    }

    fn fixture_lead() -> Lead {
        let submission = LeadSubmission {
            source: Some("dispatch_test".to_string()),
            contact: Some(json!({"email": "ana@example.com"})),
            qualification: None,
        };
        match Lead::stamp(submission, LeadId::new(), now_utc()) {
            Ok(lead) => lead,
            Err(err) => panic!("invalid fixture lead: {err}"),
        }
    }

    #[tokio::test]
    async fn worker_delivers_queued_leads_in_order_and_drains_on_close() {
        let relay = Arc::new(RecordingRelay::default());
        let telemetry = Arc::new(ServiceTelemetry::default());
        let (handle, worker) = spawn_dispatcher(relay.clone(), 8, Arc::clone(&telemetry));

        let leads: Vec<Lead> = (0..3).map(|_| fixture_lead()).collect();
        for lead in &leads {
            handle.notify(lead.clone());
        }
        drop(handle);
        if let Err(err) = worker.await {
            panic!("dispatcher worker failed: {err}");
        }

        let delivered = match relay.delivered.lock() {
            Ok(delivered) => delivered.clone(),
            Err(_) => panic!("recording relay poisoned"),
        };
        let expected: Vec<LeadId> = leads.iter().map(|lead| lead.lead_id.clone()).collect();
        assert_eq!(delivered, expected);
        assert_eq!(telemetry.snapshot().relay_delivered_total, 3);
    }

    #[tokio::test]
    async fn failures_are_counted_and_do_not_stop_the_worker() {
        let telemetry = Arc::new(ServiceTelemetry::default());
        let (handle, worker) =
            spawn_dispatcher(Arc::new(SlowFailingRelay), 8, Arc::clone(&telemetry));

        handle.notify(fixture_lead());
        handle.notify(fixture_lead());
        drop(handle);
        if let Err(err) = worker.await {
            panic!("dispatcher worker failed: {err}");
        }

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.relay_failed_total, 2);
        assert_eq!(snapshot.relay_delivered_total, 0);
    }

    #[tokio::test]
    async fn full_queue_drops_notification_without_blocking() {
        let telemetry = Arc::new(ServiceTelemetry::default());
        let (handle, worker) =
            spawn_dispatcher(Arc::new(SlowFailingRelay), 1, Arc::clone(&telemetry));

        for _ in 0..10 {
            handle.notify(fixture_lead());
        }
        drop(handle);
        if let Err(err) = worker.await {
            panic!("dispatcher worker failed: {err}");
        }

        let snapshot = telemetry.snapshot();
        assert!(snapshot.relay_dropped_total >= 8, "snapshot: {snapshot:?}");
        assert_eq!(
            snapshot.relay_dropped_total + snapshot.relay_failed_total,
            10,
            "every notification is either attempted once or dropped: {snapshot:?}"
        );
    }
}
