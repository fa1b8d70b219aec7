use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{CandidateId, InterviewerId};
use super::repository::{BookingStore, DataSource};
use super::service::{SchedulingError, SchedulingService};

/// Blend-model query payload.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PredictRequest {
    pub cosine: f64,
    pub matching: f64,
}

/// Router builder exposing batch and per-candidate scheduling plus read-only views.
pub fn scheduling_router<D, B>(service: Arc<SchedulingService<D, B>>) -> Router
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    Router::new()
        .route("/api/v1/schedule", post(batch_handler::<D, B>))
        .route(
            "/api/v1/candidates/:candidate_id/schedule",
            post(schedule_candidate_handler::<D, B>),
        )
        .route(
            "/api/v1/schedule/candidates/:candidate_id",
            get(candidate_schedule_handler::<D, B>),
        )
        .route(
            "/api/v1/schedule/interviewers/:interviewer_id",
            get(interviewer_schedule_handler::<D, B>),
        )
        .route(
            "/api/v1/scores/:candidate_id/:interviewer_id",
            get(scores_handler::<D, B>),
        )
        .route("/api/v1/predict", post(predict_handler::<D, B>))
        .with_state(service)
}

pub(crate) async fn batch_handler<D, B>(
    State(service): State<Arc<SchedulingService<D, B>>>,
) -> Response
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    run_blocking(move || {
        let report = service.schedule_batch();
        match service.flush_pending() {
            Ok(persisted) => {
                let payload = json!({
                    "report": report,
                    "persisted": persisted,
                });
                (StatusCode::OK, axum::Json(payload)).into_response()
            }
            Err(err) => {
                let payload = json!({
                    "error": err.to_string(),
                    "report": report,
                    "pending": service.pending().len(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
            }
        }
    })
    .await
}

pub(crate) async fn schedule_candidate_handler<D, B>(
    State(service): State<Arc<SchedulingService<D, B>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    run_blocking(move || {
        let id = CandidateId(candidate_id);
        let outcome = match service.update_and_schedule(&id) {
            Ok(outcome) => outcome,
            Err(SchedulingError::CandidateNotFound(_)) => {
                let payload = json!({
                    "error": "candidate not found",
                    "candidate_id": id.0,
                });
                return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
            }
            Err(other) => return internal_error(other),
        };

        let persisted = service.flush_pending().is_ok();
        let payload = json!({
            "candidate_id": id.0,
            "outcome": outcome,
            "persisted": persisted,
        });
        (StatusCode::OK, axum::Json(payload)).into_response()
    })
    .await
}

pub(crate) async fn candidate_schedule_handler<D, B>(
    State(service): State<Arc<SchedulingService<D, B>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    run_blocking(move || {
        match service.bookings_for_candidate(&CandidateId(candidate_id)) {
            Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
            Err(err) => internal_error(err),
        }
    })
    .await
}

pub(crate) async fn interviewer_schedule_handler<D, B>(
    State(service): State<Arc<SchedulingService<D, B>>>,
    Path(interviewer_id): Path<String>,
) -> Response
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    run_blocking(move || {
        match service.bookings_for_interviewer(&InterviewerId(interviewer_id)) {
            Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
            Err(err) => internal_error(err),
        }
    })
    .await
}

pub(crate) async fn scores_handler<D, B>(
    State(service): State<Arc<SchedulingService<D, B>>>,
    Path((candidate_id, interviewer_id)): Path<(String, String)>,
) -> Response
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    run_blocking(move || {
        let scores = service.scores_for(
            &CandidateId(candidate_id.clone()),
            &InterviewerId(interviewer_id.clone()),
        );
        let payload = json!({
            "candidate_id": candidate_id,
            "interviewer_id": interviewer_id,
            "cosine": scores.cosine,
            "jaccard": scores.jaccard,
            "matching": scores.matching,
        });
        (StatusCode::OK, axum::Json(payload)).into_response()
    })
    .await
}

pub(crate) async fn predict_handler<D, B>(
    State(service): State<Arc<SchedulingService<D, B>>>,
    axum::Json(request): axum::Json<PredictRequest>,
) -> Response
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    run_blocking(move || match service.train_blender() {
        Ok(model) => {
            let payload = json!({
                "score": model.predict(request.cosine, request.matching),
                "intercept": model.intercept,
                "coefficients": model.coefficients,
                "samples": model.samples,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    })
    .await
}

/// Runs service work on the blocking pool; the service holds a std mutex and may touch files.
async fn run_blocking<F>(work: F) -> Response
where
    F: FnOnce() -> Response + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .unwrap_or_else(|err| {
            error!(error = %err, "scheduling request task failed");
            let payload = json!({
                "error": "scheduling request task failed",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        })
}

fn internal_error(err: SchedulingError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
