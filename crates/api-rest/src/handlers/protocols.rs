use super::Reply;
use crate::error::{run, ApiError};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller, ProtocolListQuery};
use crate::AppState;
use api_shared::{
    ApiResult, ApplyProtocolReq, ProtocolApplicationEnvelope, ProtocolApplicationRes,
    ProtocolDeletedEnvelope, ProtocolDeletedRes, ProtocolEnvelope, ProtocolListEnvelope,
    ProtocolListRes, ProtocolRes, RegisterProtocolReq,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use triage_core::{AssessmentId, ProtocolId};

#[utoipa::path(
    get,
    path = "/protocols",
    params(ProtocolListQuery),
    responses(
        (status = 200, description = "Protocols ordered by name and version", body = ProtocolListEnvelope)
    ),
    tag = "protocols"
)]
#[axum::debug_handler]
pub async fn list_protocols(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProtocolListQuery>,
) -> Reply<ProtocolListRes> {
    let engine = state.engine;
    let protocols = run(move || engine.protocols().list(query.include_inactive)).await?;
    Ok(Json(ApiResult::ok(protocols.into())))
}

#[utoipa::path(
    post,
    path = "/protocols",
    request_body = RegisterProtocolReq,
    responses(
        (status = 201, description = "Protocol registered", body = ProtocolEnvelope),
        (status = 400, description = "Invalid protocol or duplicate name and version")
    ),
    tag = "protocols"
)]
/// Register a single protocol. Bulk loading goes through the catalog file at startup.
#[axum::debug_handler]
pub async fn register_protocol(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterProtocolReq>,
) -> Result<(StatusCode, Json<ApiResult<ProtocolRes>>), ApiError> {
    let engine = state.engine;
    let protocol = run(move || engine.protocols().register(req.into())).await?;
    Ok((StatusCode::CREATED, Json(ApiResult::ok(protocol.into()))))
}

#[utoipa::path(
    get,
    path = "/protocols/{id}",
    params(("id" = String, Path, description = "Protocol id")),
    responses(
        (status = 200, description = "The protocol", body = ProtocolEnvelope),
        (status = 404, description = "Protocol not found")
    ),
    tag = "protocols"
)]
#[axum::debug_handler]
pub async fn get_protocol(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProtocolId>,
) -> Reply<ProtocolRes> {
    let engine = state.engine;
    let protocol = run(move || engine.protocols().get(id)).await?;
    Ok(Json(ApiResult::ok(protocol.into())))
}

#[utoipa::path(
    post,
    path = "/protocols/{id}/deactivate",
    params(("id" = String, Path, description = "Protocol id")),
    responses(
        (status = 200, description = "Protocol deactivated", body = ProtocolEnvelope),
        (status = 404, description = "Protocol not found")
    ),
    tag = "protocols"
)]
#[axum::debug_handler]
pub async fn deactivate_protocol(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProtocolId>,
) -> Reply<ProtocolRes> {
    let engine = state.engine;
    let protocol = run(move || engine.protocols().deactivate(id)).await?;
    Ok(Json(ApiResult::ok(protocol.into())))
}

#[utoipa::path(
    delete,
    path = "/protocols/{id}",
    params(("id" = String, Path, description = "Protocol id")),
    responses(
        (status = 200, description = "Protocol soft-deleted", body = ProtocolDeletedEnvelope),
        (status = 404, description = "Protocol not found")
    ),
    tag = "protocols"
)]
/// Soft-delete a protocol. Assessments it was applied to keep their history.
#[axum::debug_handler]
pub async fn delete_protocol(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProtocolId>,
) -> Reply<ProtocolDeletedRes> {
    let engine = state.engine;
    run(move || engine.protocols().delete(id)).await?;
    Ok(Json(ApiResult::ok(ProtocolDeletedRes { protocol_id: id })))
}

#[utoipa::path(
    get,
    path = "/assessments/{id}/protocols/suggestions",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Applicable protocols whose criteria match the latest vital signs", body = ProtocolListEnvelope),
        (status = 404, description = "Assessment not found")
    ),
    tag = "protocols"
)]
#[axum::debug_handler]
pub async fn suggest_protocols(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AssessmentId>,
) -> Reply<ProtocolListRes> {
    let engine = state.engine;
    let suggestions = run(move || engine.protocols().suggest(id)).await?;
    Ok(Json(ApiResult::ok(suggestions.into())))
}

#[utoipa::path(
    post,
    path = "/assessments/{id}/protocols",
    request_body = ApplyProtocolReq,
    params(
        ("id" = String, Path, description = "Assessment id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "Protocol applied; level and priority overridden", body = ProtocolApplicationEnvelope),
        (status = 403, description = "Caller may not perform triage"),
        (status = 404, description = "Assessment or protocol not found"),
        (status = 409, description = "Assessment closed, protocol not applicable or already applied")
    ),
    tag = "protocols"
)]
/// Apply a protocol to an open assessment.
#[axum::debug_handler]
pub async fn apply_protocol(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<AssessmentId>,
    ApiJson(req): ApiJson<ApplyProtocolReq>,
) -> Reply<ProtocolApplicationRes> {
    let engine = state.engine;
    let applied = run(move || engine.protocols().apply(caller, id, req.protocol_id)).await?;
    Ok(Json(ApiResult::ok(applied.into())))
}
