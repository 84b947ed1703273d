use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, DeviceTypeId, RoleContext};
use super::lifecycle::{EmpanelmentEvent, TransitionError};
use super::repository::{ApplicationRepository, DecisionNotifier, RepositoryError};
use super::service::{ApplicationIntake, ApplicationServiceError, EmpanelmentService};

/// Router builder exposing HTTP endpoints for intake, events, and payments.
pub fn empanelment_router<R, N>(service: Arc<EmpanelmentService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: DecisionNotifier + 'static,
{
    Router::new()
        .route("/api/v1/empanelment/applications", post(open_handler::<R, N>))
        .route(
            "/api/v1/empanelment/applications/:application_id",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/empanelment/applications/:application_id/events",
            post(event_handler::<R, N>),
        )
        .route(
            "/api/v1/empanelment/applications/:application_id/payments",
            post(payment_handler::<R, N>),
        )
        .with_state(service)
}

/// Envelope carrying one lifecycle event plus the authenticated actor the
/// session layer resolved for this call.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub actor: RoleContext,
    pub event: EmpanelmentEvent,
}

/// Settlement notice forwarded from the payment-processor webhook.
#[derive(Debug, Deserialize)]
pub struct PaymentNotice {
    pub device_type: DeviceTypeId,
    pub amount_inr: u32,
    pub reference: String,
    pub settled_on: NaiveDate,
}

pub(crate) async fn open_handler<R, N>(
    State(service): State<Arc<EmpanelmentService<R, N>>>,
    axum::Json(intake): axum::Json<ApplicationIntake>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: DecisionNotifier + 'static,
{
    match service.open(intake) {
        Ok(stored) => (StatusCode::CREATED, axum::Json(stored.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<EmpanelmentService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: DecisionNotifier + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(stored) => (StatusCode::OK, axum::Json(stored.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn event_handler<R, N>(
    State(service): State<Arc<EmpanelmentService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(envelope): axum::Json<EventEnvelope>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: DecisionNotifier + 'static,
{
    let id = ApplicationId(application_id);
    match service.apply(&id, envelope.event, &envelope.actor) {
        Ok(stored) => (StatusCode::OK, axum::Json(stored.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_handler<R, N>(
    State(service): State<Arc<EmpanelmentService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(notice): axum::Json<PaymentNotice>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: DecisionNotifier + 'static,
{
    let id = ApplicationId(application_id);
    match service.record_payment(
        &id,
        notice.device_type,
        notice.amount_inr,
        notice.reference,
        notice.settled_on,
    ) {
        Ok(stored) => (StatusCode::OK, axum::Json(stored.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

/// Map service failures onto the HTTP surface. The core only fixes the error
/// kind; presentation lives here.
fn error_response(error: ApplicationServiceError) -> Response {
    let status = match &error {
        ApplicationServiceError::Transition(TransitionError::Forbidden { .. }) => {
            StatusCode::FORBIDDEN
        }
        ApplicationServiceError::Transition(TransitionError::IllegalTransition { .. }) => {
            StatusCode::CONFLICT
        }
        ApplicationServiceError::Transition(_) | ApplicationServiceError::Payment(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Repository(RepositoryError::Conflict)
        | ApplicationServiceError::Repository(RepositoryError::StaleVersion { .. }) => {
            StatusCode::CONFLICT
        }
        ApplicationServiceError::Repository(RepositoryError::Unavailable(_))
        | ApplicationServiceError::Notify(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
