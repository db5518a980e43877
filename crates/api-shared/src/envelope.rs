//! Success/failure envelope returned by every remote operation.

use crate::dto::{
    AssessmentListRes, AssessmentRes, CanLinkRes, CreatedAssessmentRes, DailyReportRes,
    EvaluationRes, ProtocolApplicationRes, ProtocolDeletedRes, ProtocolListRes, ProtocolRes,
    QueueEntryListRes, QueueEntryRes, QueuePositionListRes, QueueStatsRes, ReassessmentListRes,
    ReassessmentRes, VitalSignsListRes, VitalSignsRes, WeeklyReportRes,
};
use serde::{Deserialize, Serialize};
use triage_core::ErrorKind;
use utoipa::ToSchema;

/// Outcome classification carried next to the payload.
///
/// `Empty` is a success: the operation ran but had nothing to return, for example calling the
/// next patient from an empty queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Ok,
    Empty,
    Authorization,
    NotFound,
    InvalidState,
    Validation,
    Fatal,
}

impl From<ErrorKind> for ResultKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Authorization => ResultKind::Authorization,
            ErrorKind::NotFound => ResultKind::NotFound,
            ErrorKind::InvalidState => ResultKind::InvalidState,
            ErrorKind::Validation => ResultKind::Validation,
            ErrorKind::Fatal => ResultKind::Fatal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[aliases(
    EvaluationEnvelope = ApiResult<EvaluationRes>,
    CreatedAssessmentEnvelope = ApiResult<CreatedAssessmentRes>,
    AssessmentEnvelope = ApiResult<AssessmentRes>,
    AssessmentListEnvelope = ApiResult<AssessmentListRes>,
    VitalSignsEnvelope = ApiResult<VitalSignsRes>,
    VitalSignsListEnvelope = ApiResult<VitalSignsListRes>,
    ReassessmentEnvelope = ApiResult<ReassessmentRes>,
    ReassessmentListEnvelope = ApiResult<ReassessmentListRes>,
    CanLinkEnvelope = ApiResult<CanLinkRes>,
    QueueEntryEnvelope = ApiResult<QueueEntryRes>,
    QueueEntryListEnvelope = ApiResult<QueueEntryListRes>,
    QueuePositionListEnvelope = ApiResult<QueuePositionListRes>,
    QueueStatsEnvelope = ApiResult<QueueStatsRes>,
    ProtocolEnvelope = ApiResult<ProtocolRes>,
    ProtocolListEnvelope = ApiResult<ProtocolListRes>,
    ProtocolApplicationEnvelope = ApiResult<ProtocolApplicationRes>,
    ProtocolDeletedEnvelope = ApiResult<ProtocolDeletedRes>,
    DailyReportEnvelope = ApiResult<DailyReportRes>,
    WeeklyReportEnvelope = ApiResult<WeeklyReportRes>
)]
pub struct ApiResult<T> {
    pub success: bool,
    pub message: String,
    pub kind: ResultKind,
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "ok".into(),
            kind: ResultKind::Ok,
            data: Some(data),
        }
    }

    /// Success without a payload.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: ResultKind::Empty,
            data: None,
        }
    }

    /// `ok` when there is a payload, `empty` with `message` otherwise.
    pub fn from_option(data: Option<T>, message: impl Into<String>) -> Self {
        match data {
            Some(data) => Self::ok(data),
            None => Self::empty(message),
        }
    }

    pub fn failure(kind: ResultKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind,
            data: None,
        }
    }
}
