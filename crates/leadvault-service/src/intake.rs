use std::sync::Arc;

use leadvault_core::{now_utc, Lead, LeadError, LeadId, LeadStore, LeadSubmission, StoreError};
use serde::Serialize;

use crate::dispatch::RelayHandle;
use crate::telemetry::ServiceTelemetry;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{0}")]
    InvalidPayload(String),
    #[error("lead could not be persisted: {0}")]
    PersistenceFailed(#[source] StoreError),
    #[error("unexpected intake failure: {0}")]
    Unexpected(String),
}

impl IntakeError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::PersistenceFailed(_) => "persistence_failed",
            Self::Unexpected(_) => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IntakeReceipt {
    pub lead_id: LeadId,
}

/// Validates, persists and relays lead submissions.
///
/// A submission only succeeds once its lead is in the store. The relay sees
/// the lead strictly afterwards and its outcome never reaches the caller.
#[derive(Clone)]
pub struct IntakeHandler {
    store: Arc<dyn LeadStore>,
    relay: Option<RelayHandle>,
    telemetry: Arc<ServiceTelemetry>,
}

impl IntakeHandler {
    #[must_use]
    pub fn new(
        store: Arc<dyn LeadStore>,
        relay: Option<RelayHandle>,
        telemetry: Arc<ServiceTelemetry>,
    ) -> Self {
        Self { store, relay, telemetry }
    }

    #[must_use]
    pub fn telemetry(&self) -> &Arc<ServiceTelemetry> {
        &self.telemetry
    }

    /// # Errors
    /// Returns [`IntakeError::InvalidPayload`] before any mutation when the
    /// contact email is missing, and [`IntakeError::PersistenceFailed`] when
    /// the store rejects the append.
    pub async fn submit(&self, submission: LeadSubmission) -> Result<IntakeReceipt, IntakeError> {
        self.telemetry.record_request();
        match self.persist_and_relay(submission).await {
            Ok(receipt) => {
                self.telemetry.record_success();
                Ok(receipt)
            }
            Err(err) => {
                self.telemetry.record_failure(err.code());
                Err(err)
            }
        }
    }

    async fn persist_and_relay(
        &self,
        submission: LeadSubmission,
    ) -> Result<IntakeReceipt, IntakeError> {
        let lead = Lead::stamp(submission, LeadId::new(), now_utc()).map_err(|err| match err {
            LeadError::Validation(message) => IntakeError::InvalidPayload(message),
            LeadError::Time(message) => IntakeError::Unexpected(message),
        })?;

        let store = Arc::clone(&self.store);
        let relay = self.relay.clone();
        // A dropped request future must not split the append from the enqueue.
        tokio::task::spawn_blocking(move || {
            persist_then_enqueue(store.as_ref(), relay.as_ref(), lead)
        })
            .await
            .map_err(|err| IntakeError::Unexpected(format!("persistence join failure: {err}")))?
    }
}

fn persist_then_enqueue(
    store: &dyn LeadStore,
    relay: Option<&RelayHandle>,
    lead: Lead,
) -> Result<IntakeReceipt, IntakeError> {
    let lead_id = store.append_lead(&lead).map_err(|err| {
        tracing::error!(lead_id = %lead.lead_id, error = %err, "lead persistence failed");
        IntakeError::PersistenceFailed(err)
    })?;

    tracing::info!(%lead_id, source = lead.source.as_deref().unwrap_or("-"), "lead secured");

    match relay {
        Some(relay) => relay.notify(lead),
        None => tracing::debug!(%lead_id, "relay not configured; skipping"),
    }

    Ok(IntakeReceipt { lead_id })
}
