use crate::infra::{AppState, BookingBackend, SchedulingApp};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use interview_match::error::AppError;
use interview_match::scheduling::{
    normalize_skills, scheduling_router, Candidate, CandidateId, DataSourceError, Roster,
    SchedulingQueue,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Registration dependencies shared with the intake endpoint.
#[derive(Clone)]
pub(crate) struct RegistrationState {
    pub(crate) roster: Arc<Roster>,
    pub(crate) queue: SchedulingQueue,
    pub(crate) min_gate_score: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterCandidateRequest {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) field: String,
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) skills: Vec<String>,
    pub(crate) gate_score: u32,
}

pub(crate) fn with_scheduling_routes(service: Arc<SchedulingApp>) -> axum::Router {
    scheduling_router::<Roster, BookingBackend>(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/candidates",
            axum::routing::post(register_candidate_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Gate check, registration, then a fire-and-forget scheduling job.
pub(crate) async fn register_candidate_endpoint(
    Extension(registration): Extension<RegistrationState>,
    Json(request): Json<RegisterCandidateRequest>,
) -> Result<Response, AppError> {
    if request.gate_score < registration.min_gate_score {
        info!(
            candidate_id = %request.id,
            gate_score = request.gate_score,
            minimum = registration.min_gate_score,
            "registration below gate score"
        );
        let payload = json!({
            "error": "gate score below minimum",
            "gate_score": request.gate_score,
            "minimum": registration.min_gate_score,
        });
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response());
    }

    let candidate = Candidate {
        id: CandidateId(request.id),
        field: request.field,
        email: request.email,
        skills: normalize_skills(request.skills),
    };

    let candidate = match registration.roster.register(candidate) {
        Ok(candidate) => candidate,
        Err(DataSourceError::Conflict(id)) => {
            let payload = json!({
                "error": "candidate already exists",
                "candidate_id": id,
            });
            return Ok((StatusCode::CONFLICT, Json(payload)).into_response());
        }
        Err(other) => {
            warn!(error = %other, "candidate registration failed");
            let payload = json!({ "error": other.to_string() });
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response());
        }
    };

    let ticket = registration.queue.enqueue(candidate.id.clone())?;
    let payload = json!({
        "candidate_id": ticket.candidate_id().0,
        "status": "queued",
    });
    Ok((StatusCode::ACCEPTED, Json(payload)).into_response())
}
