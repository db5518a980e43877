//! # Triage Core
//!
//! Core business logic for the triage assessment and priority queue engine.
//!
//! This crate classifies arriving patients from their vital signs, computes a dispatch
//! priority, keeps department-scoped queues with acuity-based reassessment deadlines, assists
//! with clinical protocols and produces daily/weekly statistics:
//! - [`vitals`]: vital-sign validation and clinical status evaluation
//! - [`acuity`]: acuity level, priority and SLA calculation
//! - [`assessment`]: the assessment lifecycle
//! - [`queue`]: enqueue, call-next, reorder, overdue and statistics
//! - [`protocol`]: protocol matching, application and catalog management
//! - [`monitor`]: overdue scanning
//! - [`reporting`]: read-only aggregates
//!
//! **No API concerns**: HTTP servers, request parsing and process setup belong in `api-rest`,
//! `triage-cli` and the runtime binary. Identity, patient lookup, notification delivery, time
//! and persistence are reached through the traits in [`collaborators`] and [`store`].

pub mod acuity;
pub mod assessment;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
mod locks;
pub mod monitor;
pub mod protocol;
pub mod queue;
pub mod reporting;
pub mod store;
pub mod vitals;

#[cfg(test)]
mod test_support;

pub use acuity::{compute_level, compute_priority, AcuityLevel, Priority, SlaPolicy};
pub use assessment::{
    AppliedProtocol, AssessmentService, AssessmentStatus, Completion, CreatedAssessment,
    IsolationKind, NewAssessment, ReassessmentReason, ReassessmentRecord, TriageAssessment,
};
pub use collaborators::{
    AcceptAllPatients, Authorizer, Clock, ManualClock, Notification, NotificationKind, Notifier,
    PatientDirectory, RecordingNotifier, StaticAuthorizer, StaticPatientDirectory, SystemClock,
    TracingNotifier,
};
pub use config::TriageConfig;
pub use engine::{Collaborators, TriageEngine};
pub use error::{ErrorKind, TriageError, TriageResult};
pub use monitor::SlaMonitor;
pub use protocol::{
    parse_catalog, read_catalog_file, ComparisonOperator, Criterion, MatchMode, NewProtocol,
    ProtocolApplication, ProtocolService, TriageProtocol,
};
pub use queue::{
    dispatch_order, EnqueueRequest, QueuePosition, QueueService, QueueStats, QueueStatus,
    TriageQueueEntry,
};
pub use reporting::{DailyReport, ReportingService, StatusCounts, WeeklyReport};
pub use store::{MemoryStore, StoreError, TriageStore};
pub use vitals::{
    clinical_status, evaluate, ClinicalStatus, Evaluation, Finding, VitalSign, VitalSigns,
    VitalSignsSnapshot,
};

// Re-export the shared identifier and text types so downstream crates need one import path.
pub use triage_types::{
    AssessmentId, DepartmentId, DoctorId, NonEmptyText, PatientId, ProtocolId, QueueEntryId,
    ReassessmentId, UserId, VitalSignsId,
};
