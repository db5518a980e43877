//! Persistence boundary.
//!
//! Each entity has its own repository trait for reads. All writes go through
//! [`UnitOfWork::commit`], which receives every change an operation produced as one
//! [`ChangeSet`] and must apply it atomically: either everything becomes visible or nothing does.
//! That single call is the transactional boundary of every engine operation.
//!
//! Soft-deleted rows are invisible to every read method.

mod memory;

pub use memory::MemoryStore;

use crate::assessment::{AssessmentStatus, ReassessmentRecord, TriageAssessment};
use crate::protocol::TriageProtocol;
use crate::queue::{QueueStatus, TriageQueueEntry};
use crate::vitals::VitalSignsSnapshot;
use chrono::{DateTime, Utc};
use triage_types::{AssessmentId, DepartmentId, PatientId, ProtocolId, QueueEntryId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("change set rejected: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Filter for assessment listings. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct AssessmentFilter {
    pub patient_id: Option<PatientId>,
    pub status: Option<AssessmentStatus>,
    pub open: Option<bool>,
    /// Inclusive lower bound on arrival time.
    pub arrived_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on arrival time.
    pub arrived_to: Option<DateTime<Utc>>,
}

impl AssessmentFilter {
    pub fn matches(&self, assessment: &TriageAssessment) -> bool {
        self.patient_id.map_or(true, |p| assessment.patient_id == p)
            && self.status.map_or(true, |s| assessment.status == s)
            && self.open.map_or(true, |o| assessment.is_open == o)
            && self.arrived_from.map_or(true, |t| assessment.arrived_at >= t)
            && self.arrived_to.map_or(true, |t| assessment.arrived_at < t)
    }
}

/// Filter for queue listings. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct QueueFilter {
    pub department: Option<DepartmentId>,
    pub statuses: Option<Vec<QueueStatus>>,
    /// Inclusive lower bound on enqueue time.
    pub queued_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on enqueue time.
    pub queued_to: Option<DateTime<Utc>>,
}

impl QueueFilter {
    pub fn waiting_in(department: Option<DepartmentId>) -> Self {
        Self {
            department,
            statuses: Some(vec![QueueStatus::Waiting]),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &TriageQueueEntry) -> bool {
        self.department
            .map_or(true, |d| entry.target_department == Some(d))
            && self
                .statuses
                .as_ref()
                .map_or(true, |s| s.contains(&entry.status))
            && self.queued_from.map_or(true, |t| entry.queued_at >= t)
            && self.queued_to.map_or(true, |t| entry.queued_at < t)
    }
}

pub trait AssessmentRepository: Send + Sync {
    fn find_assessment(&self, id: AssessmentId) -> StoreResult<Option<TriageAssessment>>;
    fn list_assessments(&self, filter: &AssessmentFilter) -> StoreResult<Vec<TriageAssessment>>;
}

pub trait VitalSignsRepository: Send + Sync {
    /// Snapshots for an assessment, oldest first.
    fn vital_signs_for(&self, assessment: AssessmentId) -> StoreResult<Vec<VitalSignsSnapshot>>;

    /// The most recent snapshot, if any.
    fn latest_vital_signs(
        &self,
        assessment: AssessmentId,
    ) -> StoreResult<Option<VitalSignsSnapshot>> {
        Ok(self.vital_signs_for(assessment)?.pop())
    }
}

pub trait ReassessmentRepository: Send + Sync {
    /// Records for an assessment, oldest first.
    fn reassessments_for(&self, assessment: AssessmentId)
        -> StoreResult<Vec<ReassessmentRecord>>;

    /// Records created in `[from, to)`, oldest first.
    fn reassessments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ReassessmentRecord>>;
}

pub trait QueueRepository: Send + Sync {
    fn find_queue_entry(&self, id: QueueEntryId) -> StoreResult<Option<TriageQueueEntry>>;

    /// The non-terminal entry for an assessment, if there is one.
    fn active_entry_for(&self, assessment: AssessmentId)
        -> StoreResult<Option<TriageQueueEntry>>;

    /// Every entry an assessment has had, oldest first.
    fn entries_for(&self, assessment: AssessmentId) -> StoreResult<Vec<TriageQueueEntry>>;

    fn list_queue_entries(&self, filter: &QueueFilter) -> StoreResult<Vec<TriageQueueEntry>>;
}

pub trait ProtocolRepository: Send + Sync {
    fn find_protocol(&self, id: ProtocolId) -> StoreResult<Option<TriageProtocol>>;
    fn list_protocols(&self) -> StoreResult<Vec<TriageProtocol>>;
}

pub trait UnitOfWork: Send + Sync {
    /// Applies every change in `changes` atomically.
    fn commit(&self, changes: ChangeSet) -> StoreResult<()>;
}

/// Everything the engine needs from persistence.
pub trait TriageStore:
    AssessmentRepository
    + VitalSignsRepository
    + ReassessmentRepository
    + QueueRepository
    + ProtocolRepository
    + UnitOfWork
{
}

impl<T> TriageStore for T where
    T: AssessmentRepository
        + VitalSignsRepository
        + ReassessmentRepository
        + QueueRepository
        + ProtocolRepository
        + UnitOfWork
{
}

/// Writes staged by one operation.
///
/// Assessments, queue entries and protocols are upserted. Vital-signs snapshots and
/// reassessment records are append-only: committing one whose id already exists is rejected.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub assessments: Vec<TriageAssessment>,
    pub vital_signs: Vec<VitalSignsSnapshot>,
    pub reassessments: Vec<ReassessmentRecord>,
    pub queue_entries: Vec<TriageQueueEntry>,
    pub protocols: Vec<TriageProtocol>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_assessment(&mut self, assessment: TriageAssessment) -> &mut Self {
        self.assessments.push(assessment);
        self
    }

    pub fn append_vital_signs(&mut self, snapshot: VitalSignsSnapshot) -> &mut Self {
        self.vital_signs.push(snapshot);
        self
    }

    pub fn append_reassessment(&mut self, record: ReassessmentRecord) -> &mut Self {
        self.reassessments.push(record);
        self
    }

    pub fn put_queue_entry(&mut self, entry: TriageQueueEntry) -> &mut Self {
        self.queue_entries.push(entry);
        self
    }

    pub fn put_protocol(&mut self, protocol: TriageProtocol) -> &mut Self {
        self.protocols.push(protocol);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
            && self.vital_signs.is_empty()
            && self.reassessments.is_empty()
            && self.queue_entries.is_empty()
            && self.protocols.is_empty()
    }
}
