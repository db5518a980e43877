//! REST error type and its mapping onto status codes and the result envelope.

use api_shared::{ApiResult, ResultKind};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use triage_core::{ErrorKind, TriageError, TriageResult};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid x-user-id header")]
    MissingCaller,
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Engine(#[from] TriageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, ResultKind) {
        match self {
            ApiError::MissingCaller => (StatusCode::UNAUTHORIZED, ResultKind::Authorization),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, ResultKind::Validation),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ResultKind::Fatal),
            ApiError::Engine(e) => {
                let status = match e.kind() {
                    ErrorKind::Authorization => StatusCode::FORBIDDEN,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidState => StatusCode::CONFLICT,
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind().into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        // Fatal details stay in the log.
        let message = if kind == ResultKind::Fatal {
            tracing::error!("REST request failed: {:?}", self);
            "Internal error".to_string()
        } else {
            tracing::debug!(status = status.as_u16(), "REST request rejected: {}", self);
            self.to_string()
        };

        (status, Json(ApiResult::<()>::failure(kind, message))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Runs an engine call on the blocking pool; the engine serialises work with std mutexes.
pub(crate) async fn run<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> TriageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use triage_core::{AssessmentId, UserId};

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_engine_kinds_map_to_status_codes() {
        let cases = [
            (TriageError::Unauthorised(UserId(5)), StatusCode::FORBIDDEN),
            (
                TriageError::AssessmentNotFound(AssessmentId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                TriageError::AssessmentClosed(AssessmentId::new()),
                StatusCode::CONFLICT,
            ),
            (
                TriageError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_fatal_hides_details() {
        let response =
            ApiError::from(TriageError::Invariant("two active entries".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "fatal");
        assert_eq!(json["message"], "Internal error");
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorised() {
        let response = ApiError::MissingCaller.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["kind"], "authorization");
    }
}
