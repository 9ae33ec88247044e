//! HTTP surface for lead intake.
//!
//! - `POST /api/leads` validates, persists and relays a submission.
//! - `GET /api/status` reports liveness and request/relay counters.
//!
//! Both routes accept cross-origin requests from any origin.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use leadvault_core::{LeadId, LeadStore, LeadSubmission};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

pub mod config;
pub mod dispatch;
pub mod intake;
pub mod status;
pub mod telemetry;

use dispatch::RelayHandle;
use intake::{IntakeError, IntakeHandler};
use status::StatusReport;
use telemetry::ServiceTelemetry;

const ACCEPTED_MESSAGE: &str = "Infrastructure handshake complete.";
const PERSISTENCE_FAILED_MESSAGE: &str = "Lead could not be recorded";
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Logic Failed";

#[derive(Clone)]
pub struct ServiceState {
    intake: IntakeHandler,
    telemetry: Arc<ServiceTelemetry>,
}

impl ServiceState {
    #[must_use]
    pub fn new(
        store: Arc<dyn LeadStore>,
        relay: Option<RelayHandle>,
        telemetry: Arc<ServiceTelemetry>,
    ) -> Self {
        Self {
            intake: IntakeHandler::new(store, relay, Arc::clone(&telemetry)),
            telemetry,
        }
    }

    #[must_use]
    pub fn telemetry(&self) -> &Arc<ServiceTelemetry> {
        &self.telemetry
    }

    fn invalid_json(&self, rejection: &JsonRejection) -> ServiceFailure {
        self.telemetry.record_request();
        self.telemetry.record_failure("invalid_json");
        ServiceFailure {
            status: rejection.status(),
            code: "invalid_json",
            message: rejection.body_text(),
            details: Some(json!({"rejection": rejection.to_string()})),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct IntakeAccepted {
    status: &'static str,
    message: &'static str,
    lead_id: LeadId,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceErrorBody {
    status: &'static str,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ServiceFailure {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ServiceFailure {
    fn into_response(self) -> Response {
        let body = ServiceErrorBody {
            status: "error",
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<IntakeError> for ServiceFailure {
    fn from(err: IntakeError) -> Self {
        let code = err.code();
        match err {
            IntakeError::InvalidPayload(message) => Self {
                status: StatusCode::BAD_REQUEST,
                code,
                message,
                details: None,
            },
            IntakeError::PersistenceFailed(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code,
                message: PERSISTENCE_FAILED_MESSAGE.to_string(),
                details: None,
            },
            IntakeError::Unexpected(detail) => {
                tracing::error!(error = %detail, "unexpected intake failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    message: INTERNAL_ERROR_MESSAGE.to_string(),
                    details: None,
                }
            }
        }
    }
}

pub fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/api/leads", post(submit_lead))
        .route("/api/status", get(service_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn submit_lead(
    State(state): State<ServiceState>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Json<IntakeAccepted>, ServiceFailure> {
    let Json(submission) = payload.map_err(|rejection| state.invalid_json(&rejection))?;
    let receipt = state.intake.submit(submission).await?;
    Ok(Json(IntakeAccepted {
        status: "success",
        message: ACCEPTED_MESSAGE,
        lead_id: receipt.lead_id,
    }))
}

async fn service_status(
    State(state): State<ServiceState>,
) -> Result<Json<StatusReport>, ServiceFailure> {
    let report = status::status_report(&state.telemetry).map_err(|err| {
        tracing::error!(error = %err, "status probe failed");
        ServiceFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            details: None,
        }
    })?;
    Ok(Json(report))
}
