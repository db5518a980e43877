use super::Reply;
use crate::error::{run, ApiError};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller, DepartmentQuery};
use crate::AppState;
use api_shared::{
    ApiResult, EnqueueReq, QueueEntryEnvelope, QueueEntryListEnvelope, QueueEntryListRes,
    QueueEntryRes, QueuePositionListEnvelope, QueuePositionListRes, QueueStatsEnvelope,
    QueueStatsRes,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use triage_core::QueueEntryId;

#[utoipa::path(
    post,
    path = "/queue",
    request_body = EnqueueReq,
    params(("x-user-id" = u64, Header, description = "Acting staff member")),
    responses(
        (status = 201, description = "Entry added at the back of its department queue", body = QueueEntryEnvelope),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment closed or already queued")
    ),
    tag = "queue"
)]
/// Queue an open assessment that has no active entry.
#[axum::debug_handler]
pub async fn enqueue(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<EnqueueReq>,
) -> Result<(StatusCode, Json<ApiResult<QueueEntryRes>>), ApiError> {
    let engine = state.engine;
    let (assessment_id, request) = req.into_parts();
    let entry = run(move || engine.queue().enqueue(caller, assessment_id, request)).await?;
    Ok((StatusCode::CREATED, Json(ApiResult::ok(entry.into()))))
}

#[utoipa::path(
    post,
    path = "/queue/call-next",
    params(
        DepartmentQuery,
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "The called entry, or kind `empty` when nobody is waiting", body = QueueEntryEnvelope)
    ),
    tag = "queue"
)]
/// Call the most urgent waiting patient.
#[axum::debug_handler]
pub async fn call_next(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<QueueEntryRes> {
    let engine = state.engine;
    let called = run(move || engine.queue().call_next(caller, query.department())).await?;
    Ok(Json(ApiResult::from_option(
        called.map(QueueEntryRes::from),
        "no patients waiting",
    )))
}

#[utoipa::path(
    post,
    path = "/queue/entries/{id}/start",
    params(
        ("id" = String, Path, description = "Queue entry id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "Entry in progress", body = QueueEntryEnvelope),
        (status = 404, description = "Queue entry not found"),
        (status = 409, description = "Entry is not called")
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn start_entry(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<QueueEntryId>,
) -> Reply<QueueEntryRes> {
    let engine = state.engine;
    let entry = run(move || engine.queue().start(caller, id)).await?;
    Ok(Json(ApiResult::ok(entry.into())))
}

#[utoipa::path(
    post,
    path = "/queue/entries/{id}/complete",
    params(
        ("id" = String, Path, description = "Queue entry id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "Entry completed", body = QueueEntryEnvelope),
        (status = 404, description = "Queue entry not found"),
        (status = 409, description = "Entry already completed")
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn complete_entry(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<QueueEntryId>,
) -> Reply<QueueEntryRes> {
    let engine = state.engine;
    let entry = run(move || engine.queue().complete(caller, id)).await?;
    Ok(Json(ApiResult::ok(entry.into())))
}

#[utoipa::path(
    get,
    path = "/queue/entries/{id}",
    params(("id" = String, Path, description = "Queue entry id")),
    responses(
        (status = 200, description = "The queue entry", body = QueueEntryEnvelope),
        (status = 404, description = "Queue entry not found")
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn get_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<QueueEntryId>,
) -> Reply<QueueEntryRes> {
    let engine = state.engine;
    let entry = run(move || engine.queue().get(id)).await?;
    Ok(Json(ApiResult::ok(entry.into())))
}

#[utoipa::path(
    post,
    path = "/queue/reorder",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "New positions of waiting entries", body = QueuePositionListEnvelope)
    ),
    tag = "queue"
)]
/// Rewrite queue positions as dense ranks in dispatch order.
#[axum::debug_handler]
pub async fn reorder(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<QueuePositionListRes> {
    let engine = state.engine;
    let positions = run(move || engine.queue().reorder_by_priority(query.department())).await?;
    Ok(Json(ApiResult::ok(positions.into())))
}

#[utoipa::path(
    get,
    path = "/queue",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Waiting entries in dispatch order", body = QueueEntryListEnvelope)
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn list_waiting(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<QueueEntryListRes> {
    let engine = state.engine;
    let waiting = run(move || engine.queue().waiting(query.department())).await?;
    Ok(Json(ApiResult::ok(waiting.into())))
}

#[utoipa::path(
    get,
    path = "/queue/overdue",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Waiting entries past their reassessment deadline", body = QueueEntryListEnvelope)
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn list_overdue(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<QueueEntryListRes> {
    let engine = state.engine;
    let overdue = run(move || engine.queue().overdue(query.department())).await?;
    Ok(Json(ApiResult::ok(overdue.into())))
}

#[utoipa::path(
    get,
    path = "/queue/urgent",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Waiting entries at priority 1-2 or needing immediate care", body = QueueEntryListEnvelope)
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn list_urgent(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<QueueEntryListRes> {
    let engine = state.engine;
    let urgent = run(move || engine.queue().urgent(query.department())).await?;
    Ok(Json(ApiResult::ok(urgent.into())))
}

#[utoipa::path(
    get,
    path = "/queue/stats",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Queue counts and average wait", body = QueueStatsEnvelope)
    ),
    tag = "queue"
)]
#[axum::debug_handler]
pub async fn stats(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<QueueStatsRes> {
    let engine = state.engine;
    let stats = run(move || engine.queue().stats(query.department())).await?;
    Ok(Json(ApiResult::ok(stats.into())))
}
