//! # API REST
//!
//! REST API for the triage engine.
//!
//! Handles:
//! - HTTP endpoints with axum, one per engine operation
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, the caller header, status codes, CORS)
//!
//! Uses `api-shared` for bodies and the result envelope. The router is built from a ready
//! [`TriageEngine`]; [`runtime`] resolves one from the environment for the binaries.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;
pub mod runtime;

use axum::{
    routing::{get, post},
    Router,
};
use handlers::{assessments, protocols, queue, reports};
use tower_http::cors::CorsLayer;
use triage_core::TriageEngine;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use extract::CALLER_HEADER;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    engine: TriageEngine,
}

impl AppState {
    pub fn new(engine: TriageEngine) -> Self {
        Self { engine }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::evaluate_vitals,
        handlers::scan_overdue,
        assessments::create_assessment,
        assessments::list_open,
        assessments::get_assessment,
        assessments::reassess,
        assessments::record_vital_signs,
        assessments::list_vital_signs,
        assessments::list_reassessments,
        assessments::complete_assessment,
        assessments::cancel_assessment,
        assessments::close_active_entry,
        assessments::can_link_to_reception,
        assessments::completed_for_admission,
        queue::enqueue,
        queue::call_next,
        queue::start_entry,
        queue::complete_entry,
        queue::get_entry,
        queue::reorder,
        queue::list_waiting,
        queue::list_overdue,
        queue::list_urgent,
        queue::stats,
        protocols::list_protocols,
        protocols::register_protocol,
        protocols::get_protocol,
        protocols::deactivate_protocol,
        protocols::delete_protocol,
        protocols::suggest_protocols,
        protocols::apply_protocol,
        reports::daily_report,
        reports::weekly_report,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ResultKind,
        api_shared::VitalSignsDto,
        api_shared::LevelCountRes,
        api_shared::CreateAssessmentReq,
        api_shared::ReassessReq,
        api_shared::CompleteAssessmentReq,
        api_shared::CancelAssessmentReq,
        api_shared::EnqueueReq,
        api_shared::ApplyProtocolReq,
        api_shared::CriterionDto,
        api_shared::RegisterProtocolReq,
        api_shared::FindingRes,
        api_shared::EvaluationRes,
        api_shared::AppliedProtocolRes,
        api_shared::AssessmentRes,
        api_shared::AssessmentListRes,
        api_shared::VitalSignsRes,
        api_shared::VitalSignsListRes,
        api_shared::ReassessmentRes,
        api_shared::ReassessmentListRes,
        api_shared::CreatedAssessmentRes,
        api_shared::CanLinkRes,
        api_shared::QueueEntryRes,
        api_shared::QueueEntryListRes,
        api_shared::QueuePositionRes,
        api_shared::QueuePositionListRes,
        api_shared::QueueStatsRes,
        api_shared::ProtocolRes,
        api_shared::ProtocolListRes,
        api_shared::ProtocolApplicationRes,
        api_shared::ProtocolDeletedRes,
        api_shared::DailyReportRes,
        api_shared::WeeklyReportRes,
        api_shared::EvaluationEnvelope,
        api_shared::CreatedAssessmentEnvelope,
        api_shared::AssessmentEnvelope,
        api_shared::AssessmentListEnvelope,
        api_shared::VitalSignsEnvelope,
        api_shared::VitalSignsListEnvelope,
        api_shared::ReassessmentEnvelope,
        api_shared::ReassessmentListEnvelope,
        api_shared::CanLinkEnvelope,
        api_shared::QueueEntryEnvelope,
        api_shared::QueueEntryListEnvelope,
        api_shared::QueuePositionListEnvelope,
        api_shared::QueueStatsEnvelope,
        api_shared::ProtocolEnvelope,
        api_shared::ProtocolListEnvelope,
        api_shared::ProtocolApplicationEnvelope,
        api_shared::ProtocolDeletedEnvelope,
        api_shared::DailyReportEnvelope,
        api_shared::WeeklyReportEnvelope,
    )),
    tags(
        (name = "assessments", description = "Assessment lifecycle and vital signs"),
        (name = "queue", description = "Department queues and SLA monitoring"),
        (name = "protocols", description = "Clinical protocol catalog and application"),
        (name = "reception", description = "Hand-off to reception and admission"),
        (name = "reports", description = "Daily and weekly statistics"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Build the REST router, including Swagger UI and permissive CORS.
pub fn router(engine: TriageEngine) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/vitals/evaluate", post(handlers::evaluate_vitals))
        .route("/monitor/scan", post(handlers::scan_overdue))
        .route(
            "/assessments",
            get(assessments::list_open).post(assessments::create_assessment),
        )
        .route("/assessments/:id", get(assessments::get_assessment))
        .route("/assessments/:id/reassess", post(assessments::reassess))
        .route(
            "/assessments/:id/vitals",
            get(assessments::list_vital_signs).post(assessments::record_vital_signs),
        )
        .route(
            "/assessments/:id/reassessments",
            get(assessments::list_reassessments),
        )
        .route(
            "/assessments/:id/complete",
            post(assessments::complete_assessment),
        )
        .route("/assessments/:id/cancel", post(assessments::cancel_assessment))
        .route(
            "/assessments/:id/queue/close",
            post(assessments::close_active_entry),
        )
        .route(
            "/assessments/:id/reception-link",
            get(assessments::can_link_to_reception),
        )
        .route(
            "/assessments/:id/protocols",
            post(protocols::apply_protocol),
        )
        .route(
            "/assessments/:id/protocols/suggestions",
            get(protocols::suggest_protocols),
        )
        .route("/admissions", get(assessments::completed_for_admission))
        .route("/queue", get(queue::list_waiting).post(queue::enqueue))
        .route("/queue/call-next", post(queue::call_next))
        .route("/queue/reorder", post(queue::reorder))
        .route("/queue/overdue", get(queue::list_overdue))
        .route("/queue/urgent", get(queue::list_urgent))
        .route("/queue/stats", get(queue::stats))
        .route("/queue/entries/:id", get(queue::get_entry))
        .route("/queue/entries/:id/start", post(queue::start_entry))
        .route("/queue/entries/:id/complete", post(queue::complete_entry))
        .route(
            "/protocols",
            get(protocols::list_protocols).post(protocols::register_protocol),
        )
        .route(
            "/protocols/:id",
            get(protocols::get_protocol).delete(protocols::delete_protocol),
        )
        .route(
            "/protocols/:id/deactivate",
            post(protocols::deactivate_protocol),
        )
        .route("/reports/daily", get(reports::daily_report))
        .route("/reports/weekly", get(reports::weekly_report))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(engine))
}
