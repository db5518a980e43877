use super::Reply;
use crate::error::{run, ApiError};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller, DepartmentQuery};
use crate::AppState;
use api_shared::{
    ApiResult, AssessmentEnvelope, AssessmentListEnvelope, AssessmentListRes, AssessmentRes,
    CancelAssessmentReq, CanLinkEnvelope, CanLinkRes, CompleteAssessmentReq,
    CreateAssessmentReq, CreatedAssessmentEnvelope, CreatedAssessmentRes, QueueEntryEnvelope,
    QueueEntryRes, ReassessReq, ReassessmentEnvelope, ReassessmentListEnvelope,
    ReassessmentListRes, ReassessmentRes, VitalSignsDto, VitalSignsEnvelope,
    VitalSignsListEnvelope, VitalSignsListRes, VitalSignsRes,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use triage_core::AssessmentId;

#[utoipa::path(
    post,
    path = "/assessments",
    request_body = CreateAssessmentReq,
    params(("x-user-id" = u64, Header, description = "Acting staff member")),
    responses(
        (status = 201, description = "Assessment created and queued", body = CreatedAssessmentEnvelope),
        (status = 400, description = "Invalid complaint or vital signs"),
        (status = 403, description = "Caller may not perform triage"),
        (status = 404, description = "Patient not found")
    ),
    tag = "assessments"
)]
/// Create an assessment from intake vital signs.
///
/// Classifies the readings, persists the assessment with its first snapshot and queues it in
/// one step. Level 1 and 2 arrivals notify the alert recipients.
#[axum::debug_handler]
pub async fn create_assessment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateAssessmentReq>,
) -> Result<(StatusCode, Json<ApiResult<CreatedAssessmentRes>>), ApiError> {
    let engine = state.engine;
    let created = run(move || engine.assessments().create(caller, req.into())).await?;
    Ok((StatusCode::CREATED, Json(ApiResult::ok(created.into()))))
}

#[utoipa::path(
    get,
    path = "/assessments",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Open assessments", body = AssessmentListEnvelope)
    ),
    tag = "assessments"
)]
/// List open assessments, optionally only those queued for one department.
#[axum::debug_handler]
pub async fn list_open(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<AssessmentListRes> {
    let engine = state.engine;
    let open = run(move || engine.assessments().list_open(query.department())).await?;
    Ok(Json(ApiResult::ok(open.into())))
}

#[utoipa::path(
    get,
    path = "/assessments/{id}",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "The assessment", body = AssessmentEnvelope),
        (status = 404, description = "Assessment not found")
    ),
    tag = "assessments"
)]
#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AssessmentId>,
) -> Reply<AssessmentRes> {
    let engine = state.engine;
    let assessment = run(move || engine.assessments().get(id)).await?;
    Ok(Json(ApiResult::ok(assessment.into())))
}

#[utoipa::path(
    post,
    path = "/assessments/{id}/reassess",
    request_body = ReassessReq,
    params(
        ("id" = String, Path, description = "Assessment id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "Reassessment recorded", body = ReassessmentEnvelope),
        (status = 400, description = "Invalid level or notes"),
        (status = 403, description = "Caller may not perform triage"),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment is closed")
    ),
    tag = "assessments"
)]
/// Record a new acuity level for an open assessment.
#[axum::debug_handler]
pub async fn reassess(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<AssessmentId>,
    ApiJson(req): ApiJson<ReassessReq>,
) -> Reply<ReassessmentRes> {
    let engine = state.engine;
    let record = run(move || {
        engine
            .assessments()
            .reassess(caller, id, req.level, req.reason, req.notes)
    })
    .await?;
    Ok(Json(ApiResult::ok(record.into())))
}

#[utoipa::path(
    post,
    path = "/assessments/{id}/vitals",
    request_body = VitalSignsDto,
    params(
        ("id" = String, Path, description = "Assessment id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 201, description = "Snapshot recorded", body = VitalSignsEnvelope),
        (status = 400, description = "Readings out of range or none supplied"),
        (status = 403, description = "Caller may not perform triage"),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment is closed")
    ),
    tag = "assessments"
)]
/// Append a vital-signs snapshot. The acuity level is not changed.
#[axum::debug_handler]
pub async fn record_vital_signs(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<AssessmentId>,
    ApiJson(req): ApiJson<VitalSignsDto>,
) -> Result<(StatusCode, Json<ApiResult<VitalSignsRes>>), ApiError> {
    let engine = state.engine;
    let snapshot =
        run(move || engine.assessments().record_vital_signs(caller, id, req.into())).await?;
    Ok((StatusCode::CREATED, Json(ApiResult::ok(snapshot.into()))))
}

#[utoipa::path(
    get,
    path = "/assessments/{id}/vitals",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Snapshots, oldest first", body = VitalSignsListEnvelope),
        (status = 404, description = "Assessment not found")
    ),
    tag = "assessments"
)]
#[axum::debug_handler]
pub async fn list_vital_signs(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AssessmentId>,
) -> Reply<VitalSignsListRes> {
    let engine = state.engine;
    let snapshots = run(move || engine.assessments().vital_signs(id)).await?;
    Ok(Json(ApiResult::ok(snapshots.into())))
}

#[utoipa::path(
    get,
    path = "/assessments/{id}/reassessments",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Reassessment history, oldest first", body = ReassessmentListEnvelope),
        (status = 404, description = "Assessment not found")
    ),
    tag = "assessments"
)]
#[axum::debug_handler]
pub async fn list_reassessments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AssessmentId>,
) -> Reply<ReassessmentListRes> {
    let engine = state.engine;
    let records = run(move || engine.assessments().reassessments(id)).await?;
    Ok(Json(ApiResult::ok(records.into())))
}

#[utoipa::path(
    post,
    path = "/assessments/{id}/complete",
    request_body = CompleteAssessmentReq,
    params(
        ("id" = String, Path, description = "Assessment id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "Assessment completed and its queue entry closed", body = AssessmentEnvelope),
        (status = 403, description = "Caller may not perform triage"),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment already completed or cancelled")
    ),
    tag = "assessments"
)]
/// Complete an assessment with the recommended department and doctor.
#[axum::debug_handler]
pub async fn complete_assessment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<AssessmentId>,
    ApiJson(req): ApiJson<CompleteAssessmentReq>,
) -> Reply<AssessmentRes> {
    let engine = state.engine;
    let assessment = run(move || engine.assessments().complete(caller, id, req.into())).await?;
    Ok(Json(ApiResult::ok(assessment.into())))
}

#[utoipa::path(
    post,
    path = "/assessments/{id}/cancel",
    request_body = CancelAssessmentReq,
    params(
        ("id" = String, Path, description = "Assessment id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "Assessment cancelled and its queue entry closed", body = AssessmentEnvelope),
        (status = 400, description = "Blank reason"),
        (status = 403, description = "Caller may not perform triage"),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment already completed or cancelled")
    ),
    tag = "assessments"
)]
#[axum::debug_handler]
pub async fn cancel_assessment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<AssessmentId>,
    ApiJson(req): ApiJson<CancelAssessmentReq>,
) -> Reply<AssessmentRes> {
    let engine = state.engine;
    let assessment = run(move || engine.assessments().cancel(caller, id, &req.reason)).await?;
    Ok(Json(ApiResult::ok(assessment.into())))
}

#[utoipa::path(
    post,
    path = "/assessments/{id}/queue/close",
    params(
        ("id" = String, Path, description = "Assessment id"),
        ("x-user-id" = u64, Header, description = "Acting staff member")
    ),
    responses(
        (status = 200, description = "The closed entry, or kind `empty` when none was active", body = QueueEntryEnvelope),
        (status = 404, description = "Assessment not found")
    ),
    tag = "queue"
)]
/// Close the assessment's active queue entry if it has one.
#[axum::debug_handler]
pub async fn close_active_entry(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<AssessmentId>,
) -> Reply<QueueEntryRes> {
    let engine = state.engine;
    let closed = run(move || engine.queue().close_active_if_any(caller, id)).await?;
    Ok(Json(ApiResult::from_option(
        closed.map(QueueEntryRes::from),
        "no active queue entry",
    )))
}

#[utoipa::path(
    get,
    path = "/assessments/{id}/reception-link",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Whether reception may link the assessment", body = CanLinkEnvelope),
        (status = 404, description = "Assessment not found")
    ),
    tag = "reception"
)]
#[axum::debug_handler]
pub async fn can_link_to_reception(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AssessmentId>,
) -> Reply<CanLinkRes> {
    let engine = state.engine;
    let can_link = run(move || engine.assessments().can_link_to_reception(id)).await?;
    Ok(Json(ApiResult::ok(CanLinkRes {
        assessment_id: id,
        can_link,
    })))
}

#[utoipa::path(
    get,
    path = "/admissions",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Completed assessments ready for admission", body = AssessmentListEnvelope)
    ),
    tag = "reception"
)]
/// Completed assessments, optionally only those recommended to one department.
#[axum::debug_handler]
pub async fn completed_for_admission(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> Reply<AssessmentListRes> {
    let engine = state.engine;
    let completed =
        run(move || engine.assessments().completed_for_admission(query.department())).await?;
    Ok(Json(ApiResult::ok(completed.into())))
}
