//! Extractors that reject into the result envelope instead of axum's plain-text bodies.

use crate::error::ApiError;
use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use chrono::NaiveDate;
use serde::Deserialize;
use triage_core::{DepartmentId, UserId};
use utoipa::IntoParams;

/// Header carrying the acting staff member's user id.
pub const CALLER_HEADER: &str = "x-user-id";

/// The authenticated caller. Authentication itself happens upstream; the engine only checks
/// whether this user may perform triage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or(ApiError::MissingCaller)?;
        let user = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .ok_or(ApiError::MissingCaller)?;
        Ok(Caller(user))
    }
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DepartmentQuery {
    /// Restrict to one department; omit for all departments.
    pub department: Option<u64>,
}

impl DepartmentQuery {
    pub fn department(&self) -> Option<DepartmentId> {
        self.department.map(DepartmentId)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProtocolListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyReportQuery {
    /// UTC calendar day, `YYYY-MM-DD`.
    #[param(value_type = String, example = "2026-03-02")]
    pub date: NaiveDate,
    pub department: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeeklyReportQuery {
    /// First UTC day of the seven-day window, `YYYY-MM-DD`.
    #[param(value_type = String, example = "2026-03-02")]
    pub week_start: NaiveDate,
    pub department: Option<u64>,
}
