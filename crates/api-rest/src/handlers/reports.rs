use super::Reply;
use crate::error::run;
use crate::extract::{ApiQuery, DailyReportQuery, WeeklyReportQuery};
use crate::AppState;
use api_shared::{
    ApiResult, DailyReportEnvelope, DailyReportRes, WeeklyReportEnvelope, WeeklyReportRes,
};
use axum::extract::State;
use axum::response::Json;
use triage_core::DepartmentId;

#[utoipa::path(
    get,
    path = "/reports/daily",
    params(DailyReportQuery),
    responses(
        (status = 200, description = "Counts and averages for one UTC day", body = DailyReportEnvelope),
        (status = 400, description = "Missing or malformed date")
    ),
    tag = "reports"
)]
#[axum::debug_handler]
pub async fn daily_report(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DailyReportQuery>,
) -> Reply<DailyReportRes> {
    let engine = state.engine;
    let department = query.department.map(DepartmentId);
    let report = run(move || engine.reports().daily(query.date, department)).await?;
    Ok(Json(ApiResult::ok(report.into())))
}

#[utoipa::path(
    get,
    path = "/reports/weekly",
    params(WeeklyReportQuery),
    responses(
        (status = 200, description = "Seven daily reports with totals", body = WeeklyReportEnvelope),
        (status = 400, description = "Missing or malformed week start")
    ),
    tag = "reports"
)]
#[axum::debug_handler]
pub async fn weekly_report(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WeeklyReportQuery>,
) -> Reply<WeeklyReportRes> {
    let engine = state.engine;
    let department = query.department.map(DepartmentId);
    let report = run(move || engine.reports().weekly(query.week_start, department)).await?;
    Ok(Json(ApiResult::ok(report.into())))
}
