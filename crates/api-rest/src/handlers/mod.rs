//! Request handlers, grouped by engine component.

pub mod assessments;
pub mod protocols;
pub mod queue;
pub mod reports;

use crate::error::{run, ApiError};
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::{
    ApiResult, EvaluationEnvelope, EvaluationRes, HealthRes, HealthService,
    QueueEntryListEnvelope, QueueEntryListRes, VitalSignsDto,
};
use axum::extract::State;
use axum::response::Json;
use triage_core::{compute_priority, evaluate, VitalSigns};

pub(crate) type Reply<T> = Result<Json<ApiResult<T>>, ApiError>;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    ),
    tag = "system"
)]
/// Health check endpoint for load balancers and monitoring.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/vitals/evaluate",
    request_body = VitalSignsDto,
    responses(
        (status = 200, description = "Clinical status, findings, suggested level and priority", body = EvaluationEnvelope),
        (status = 400, description = "Readings out of range or none supplied")
    ),
    tag = "assessments"
)]
/// Evaluate a set of readings without recording anything.
#[axum::debug_handler]
pub async fn evaluate_vitals(
    State(_state): State<AppState>,
    ApiJson(req): ApiJson<VitalSignsDto>,
) -> Reply<EvaluationRes> {
    let vitals = VitalSigns::from(req);
    vitals.validate()?;

    let evaluation = evaluate(&vitals);
    let priority = compute_priority(evaluation.suggested_level, Some(&vitals));
    Ok(Json(ApiResult::ok(EvaluationRes::new(evaluation, priority))))
}

#[utoipa::path(
    post,
    path = "/monitor/scan",
    responses(
        (status = 200, description = "Waiting entries past their reassessment deadline", body = QueueEntryListEnvelope),
        (status = 500, description = "Internal server error")
    ),
    tag = "queue"
)]
/// Run an overdue scan now, notifying alert recipients when anything is overdue.
#[axum::debug_handler]
pub async fn scan_overdue(State(state): State<AppState>) -> Reply<QueueEntryListRes> {
    let engine = state.engine;
    let overdue = run(move || engine.monitor().scan_overdue()).await?;
    Ok(Json(ApiResult::ok(overdue.into())))
}
