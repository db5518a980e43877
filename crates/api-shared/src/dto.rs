//! Request and response bodies.
//!
//! Responses mirror the domain types field for field; engine identifiers travel as UUID
//! strings and identifiers owned by the surrounding application as integers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use triage_core::{
    AcuityLevel, AppliedProtocol, AssessmentId, AssessmentStatus, ClinicalStatus,
    ComparisonOperator, Completion, CreatedAssessment, Criterion, DailyReport, DepartmentId,
    DoctorId, EnqueueRequest, Evaluation, Finding, IsolationKind, MatchMode, NewAssessment,
    NewProtocol, PatientId, Priority, ProtocolApplication, ProtocolId, QueueEntryId,
    QueuePosition, QueueStats, QueueStatus, ReassessmentId, ReassessmentReason,
    ReassessmentRecord, TriageAssessment, TriageProtocol, TriageQueueEntry, VitalSign,
    VitalSigns, VitalSignsId, VitalSignsSnapshot, WeeklyReport,
};
use utoipa::ToSchema;

// ============================================================================
// Shared pieces
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Vital-sign readings. Omitted readings were not taken.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct VitalSignsDto {
    #[serde(default)]
    #[schema(example = 120)]
    pub systolic_bp: Option<u16>,
    #[serde(default)]
    #[schema(example = 80)]
    pub diastolic_bp: Option<u16>,
    #[serde(default)]
    #[schema(example = 72)]
    pub heart_rate: Option<u16>,
    #[serde(default)]
    pub respiratory_rate: Option<u16>,
    #[serde(default)]
    #[schema(example = 36.8)]
    pub temperature: Option<f64>,
    #[serde(default)]
    #[schema(example = 98)]
    pub oxygen_saturation: Option<u8>,
    /// Glasgow Coma Scale, 3 to 15.
    #[serde(default)]
    #[schema(example = 15)]
    pub consciousness: Option<u8>,
}

impl From<VitalSignsDto> for VitalSigns {
    fn from(dto: VitalSignsDto) -> Self {
        VitalSigns {
            systolic_bp: dto.systolic_bp,
            diastolic_bp: dto.diastolic_bp,
            heart_rate: dto.heart_rate,
            respiratory_rate: dto.respiratory_rate,
            temperature: dto.temperature,
            oxygen_saturation: dto.oxygen_saturation,
            consciousness: dto.consciousness,
        }
    }
}

impl From<VitalSigns> for VitalSignsDto {
    fn from(v: VitalSigns) -> Self {
        VitalSignsDto {
            systolic_bp: v.systolic_bp,
            diastolic_bp: v.diastolic_bp,
            heart_rate: v.heart_rate,
            respiratory_rate: v.respiratory_rate,
            temperature: v.temperature,
            oxygen_saturation: v.oxygen_saturation,
            consciousness: v.consciousness,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LevelCountRes {
    pub level: u8,
    pub count: usize,
}

fn level_counts(by_level: &BTreeMap<u8, usize>) -> Vec<LevelCountRes> {
    by_level
        .iter()
        .map(|(level, count)| LevelCountRes {
            level: *level,
            count: *count,
        })
        .collect()
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAssessmentReq {
    #[schema(example = 42)]
    pub patient_id: u64,
    #[schema(example = "Shortness of breath")]
    pub chief_complaint: String,
    pub vitals: VitalSignsDto,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2026-03-02T08:00:00Z")]
    pub arrived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "droplet")]
    pub isolation: Option<IsolationKind>,
    #[serde(default)]
    pub target_department: Option<u64>,
    #[serde(default)]
    pub target_doctor: Option<u64>,
}

impl From<CreateAssessmentReq> for NewAssessment {
    fn from(req: CreateAssessmentReq) -> Self {
        NewAssessment {
            patient_id: PatientId(req.patient_id),
            chief_complaint: req.chief_complaint,
            vitals: req.vitals.into(),
            notes: req.notes,
            arrived_at: req.arrived_at,
            isolation: req.isolation,
            target_department: req.target_department.map(DepartmentId),
            target_doctor: req.target_doctor.map(DoctorId),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReassessReq {
    #[schema(value_type = u8, minimum = 1, maximum = 5, example = 2)]
    pub level: AcuityLevel,
    #[schema(value_type = String, example = "deterioration")]
    pub reason: ReassessmentReason,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CompleteAssessmentReq {
    #[serde(default)]
    pub department: Option<u64>,
    #[serde(default)]
    pub doctor: Option<u64>,
}

impl From<CompleteAssessmentReq> for Completion {
    fn from(req: CompleteAssessmentReq) -> Self {
        Completion {
            department: req.department.map(DepartmentId),
            doctor: req.doctor.map(DoctorId),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CancelAssessmentReq {
    #[schema(example = "Left before being seen")]
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EnqueueReq {
    #[schema(value_type = String)]
    pub assessment_id: AssessmentId,
    /// Overrides the assessment's priority when present.
    #[serde(default)]
    #[schema(value_type = Option<u8>)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub department: Option<u64>,
    #[serde(default)]
    pub doctor: Option<u64>,
}

impl EnqueueReq {
    pub fn into_parts(self) -> (AssessmentId, EnqueueRequest) {
        (
            self.assessment_id,
            EnqueueRequest {
                priority: self.priority,
                department: self.department.map(DepartmentId),
                doctor: self.doctor.map(DoctorId),
            },
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApplyProtocolReq {
    #[schema(value_type = String)]
    pub protocol_id: ProtocolId,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CriterionDto {
    #[schema(value_type = String, example = "oxygen_saturation")]
    pub sign: VitalSign,
    #[schema(value_type = String, example = "lt")]
    pub operator: ComparisonOperator,
    #[schema(example = 90.0)]
    pub value: f64,
}

impl From<CriterionDto> for Criterion {
    fn from(dto: CriterionDto) -> Self {
        Criterion {
            sign: dto.sign,
            operator: dto.operator,
            value: dto.value,
        }
    }
}

impl From<Criterion> for CriterionDto {
    fn from(c: Criterion) -> Self {
        CriterionDto {
            sign: c.sign,
            operator: c.operator,
            value: c.value,
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterProtocolReq {
    #[schema(example = "Hypoxia")]
    pub name: String,
    #[schema(example = "1.0")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(value_type = u8, minimum = 1, maximum = 5)]
    pub level: AcuityLevel,
    /// Defaults to the priority matching `level`.
    #[serde(default)]
    #[schema(value_type = Option<u8>)]
    pub priority: Option<Priority>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub valid_to: Option<DateTime<Utc>>,
    pub criteria: Vec<CriterionDto>,
    #[serde(default)]
    #[schema(value_type = String, example = "all")]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub required_actions: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl From<RegisterProtocolReq> for NewProtocol {
    fn from(req: RegisterProtocolReq) -> Self {
        NewProtocol {
            name: req.name,
            version: req.version,
            description: req.description,
            level: req.level,
            priority: req.priority,
            valid_from: req.valid_from,
            valid_to: req.valid_to,
            criteria: req.criteria.into_iter().map(Criterion::from).collect(),
            match_mode: req.match_mode,
            required_actions: req.required_actions,
            active: req.active,
        }
    }
}

// ============================================================================
// Responses: assessments
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FindingRes {
    #[schema(value_type = String)]
    pub sign: VitalSign,
    pub value: f64,
    #[schema(value_type = String)]
    pub status: ClinicalStatus,
}

impl From<Finding> for FindingRes {
    fn from(f: Finding) -> Self {
        FindingRes {
            sign: f.sign,
            value: f.value,
            status: f.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationRes {
    #[schema(value_type = String, example = "critical")]
    pub status: ClinicalStatus,
    pub findings: Vec<FindingRes>,
    #[schema(value_type = u8)]
    pub suggested_level: AcuityLevel,
    #[schema(value_type = u8)]
    pub priority: Priority,
}

impl EvaluationRes {
    pub fn new(evaluation: Evaluation, priority: Priority) -> Self {
        EvaluationRes {
            status: evaluation.status,
            findings: evaluation.findings.into_iter().map(FindingRes::from).collect(),
            suggested_level: evaluation.suggested_level,
            priority,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedProtocolRes {
    #[schema(value_type = String)]
    pub protocol_id: ProtocolId,
    pub protocol_name: String,
    #[schema(value_type = String)]
    pub applied_at: DateTime<Utc>,
    pub applied_by: u64,
}

impl From<AppliedProtocol> for AppliedProtocolRes {
    fn from(p: AppliedProtocol) -> Self {
        AppliedProtocolRes {
            protocol_id: p.protocol_id,
            protocol_name: p.protocol_name,
            applied_at: p.applied_at,
            applied_by: p.applied_by.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssessmentRes {
    #[schema(value_type = String)]
    pub id: AssessmentId,
    pub patient_id: u64,
    pub assessor_id: u64,
    pub chief_complaint: String,
    #[schema(value_type = u8)]
    pub level: AcuityLevel,
    #[schema(value_type = u8)]
    pub priority: Priority,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>)]
    pub isolation: Option<IsolationKind>,
    #[schema(value_type = String)]
    pub arrived_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub triage_started_at: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub triage_ended_at: Option<DateTime<Utc>>,
    pub is_open: bool,
    #[schema(value_type = String, example = "pending")]
    pub status: AssessmentStatus,
    pub reassessment_count: u32,
    #[schema(value_type = Option<String>)]
    pub last_reassessed_at: Option<DateTime<Utc>>,
    pub recommended_department: Option<u64>,
    pub recommended_doctor: Option<u64>,
    pub applied_protocols: Vec<AppliedProtocolRes>,
    pub cancellation_reason: Option<String>,
}

impl From<TriageAssessment> for AssessmentRes {
    fn from(a: TriageAssessment) -> Self {
        AssessmentRes {
            id: a.id,
            patient_id: a.patient_id.0,
            assessor_id: a.assessor_id.0,
            chief_complaint: a.chief_complaint.as_str().to_string(),
            level: a.level,
            priority: a.priority,
            notes: a.notes,
            isolation: a.isolation,
            arrived_at: a.arrived_at,
            triage_started_at: a.triage_started_at,
            triage_ended_at: a.triage_ended_at,
            is_open: a.is_open,
            status: a.status,
            reassessment_count: a.reassessment_count,
            last_reassessed_at: a.last_reassessed_at,
            recommended_department: a.recommended_department.map(|d| d.0),
            recommended_doctor: a.recommended_doctor.map(|d| d.0),
            applied_protocols: a
                .applied_protocols
                .into_iter()
                .map(AppliedProtocolRes::from)
                .collect(),
            cancellation_reason: a.cancellation_reason.map(|r| r.as_str().to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssessmentListRes {
    pub assessments: Vec<AssessmentRes>,
}

impl From<Vec<TriageAssessment>> for AssessmentListRes {
    fn from(list: Vec<TriageAssessment>) -> Self {
        AssessmentListRes {
            assessments: list.into_iter().map(AssessmentRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSignsRes {
    #[schema(value_type = String)]
    pub id: VitalSignsId,
    #[schema(value_type = String)]
    pub assessment_id: AssessmentId,
    #[schema(value_type = String)]
    pub measured_at: DateTime<Utc>,
    pub recorded_by: u64,
    pub readings: VitalSignsDto,
}

impl From<VitalSignsSnapshot> for VitalSignsRes {
    fn from(s: VitalSignsSnapshot) -> Self {
        VitalSignsRes {
            id: s.id,
            assessment_id: s.assessment_id,
            measured_at: s.measured_at,
            recorded_by: s.recorded_by.0,
            readings: s.readings.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSignsListRes {
    pub vital_signs: Vec<VitalSignsRes>,
}

impl From<Vec<VitalSignsSnapshot>> for VitalSignsListRes {
    fn from(list: Vec<VitalSignsSnapshot>) -> Self {
        VitalSignsListRes {
            vital_signs: list.into_iter().map(VitalSignsRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReassessmentRes {
    #[schema(value_type = String)]
    pub id: ReassessmentId,
    #[schema(value_type = String)]
    pub assessment_id: AssessmentId,
    #[schema(value_type = u8)]
    pub previous_level: AcuityLevel,
    #[schema(value_type = u8)]
    pub new_level: AcuityLevel,
    #[schema(value_type = u8)]
    pub previous_priority: Priority,
    #[schema(value_type = u8)]
    pub new_priority: Priority,
    #[schema(value_type = String)]
    pub reason: ReassessmentReason,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    pub assessor_id: u64,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>)]
    pub protocol_id: Option<ProtocolId>,
}

impl From<ReassessmentRecord> for ReassessmentRes {
    fn from(r: ReassessmentRecord) -> Self {
        ReassessmentRes {
            id: r.id,
            assessment_id: r.assessment_id,
            previous_level: r.previous_level,
            new_level: r.new_level,
            previous_priority: r.previous_priority,
            new_priority: r.new_priority,
            reason: r.reason,
            created_at: r.created_at,
            assessor_id: r.assessor_id.0,
            notes: r.notes,
            protocol_id: r.protocol_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReassessmentListRes {
    pub reassessments: Vec<ReassessmentRes>,
}

impl From<Vec<ReassessmentRecord>> for ReassessmentListRes {
    fn from(list: Vec<ReassessmentRecord>) -> Self {
        ReassessmentListRes {
            reassessments: list.into_iter().map(ReassessmentRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatedAssessmentRes {
    pub assessment: AssessmentRes,
    pub vital_signs: VitalSignsRes,
    pub queue_entry: QueueEntryRes,
}

impl From<CreatedAssessment> for CreatedAssessmentRes {
    fn from(c: CreatedAssessment) -> Self {
        CreatedAssessmentRes {
            assessment: c.assessment.into(),
            vital_signs: c.vital_signs.into(),
            queue_entry: c.queue_entry.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CanLinkRes {
    #[schema(value_type = String)]
    pub assessment_id: AssessmentId,
    pub can_link: bool,
}

// ============================================================================
// Responses: queue
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueEntryRes {
    #[schema(value_type = String)]
    pub id: QueueEntryId,
    #[schema(value_type = String)]
    pub assessment_id: AssessmentId,
    pub patient_id: u64,
    #[schema(value_type = u8)]
    pub priority: Priority,
    #[schema(value_type = u8)]
    pub level: AcuityLevel,
    pub requires_immediate_care: bool,
    pub position: u32,
    #[schema(value_type = String)]
    pub queued_at: DateTime<Utc>,
    pub queued_by: u64,
    pub target_department: Option<u64>,
    pub target_doctor: Option<u64>,
    #[schema(value_type = Option<String>)]
    pub next_reassessment_due_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, example = "waiting")]
    pub status: QueueStatus,
    #[schema(value_type = Option<String>)]
    pub called_at: Option<DateTime<Utc>>,
    pub called_by: Option<u64>,
    #[schema(value_type = Option<String>)]
    pub started_at: Option<DateTime<Utc>>,
    pub started_by: Option<u64>,
    #[schema(value_type = Option<String>)]
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<u64>,
}

impl From<TriageQueueEntry> for QueueEntryRes {
    fn from(e: TriageQueueEntry) -> Self {
        QueueEntryRes {
            id: e.id,
            assessment_id: e.assessment_id,
            patient_id: e.patient_id.0,
            priority: e.priority,
            level: e.level,
            requires_immediate_care: e.requires_immediate_care,
            position: e.position,
            queued_at: e.queued_at,
            queued_by: e.queued_by.0,
            target_department: e.target_department.map(|d| d.0),
            target_doctor: e.target_doctor.map(|d| d.0),
            next_reassessment_due_at: e.next_reassessment_due_at,
            status: e.status,
            called_at: e.called_at,
            called_by: e.called_by.map(|u| u.0),
            started_at: e.started_at,
            started_by: e.started_by.map(|u| u.0),
            completed_at: e.completed_at,
            completed_by: e.completed_by.map(|u| u.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueEntryListRes {
    pub entries: Vec<QueueEntryRes>,
}

impl From<Vec<TriageQueueEntry>> for QueueEntryListRes {
    fn from(list: Vec<TriageQueueEntry>) -> Self {
        QueueEntryListRes {
            entries: list.into_iter().map(QueueEntryRes::from).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueuePositionRes {
    #[schema(value_type = String)]
    pub entry_id: QueueEntryId,
    #[schema(value_type = String)]
    pub assessment_id: AssessmentId,
    pub department: Option<u64>,
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueuePositionListRes {
    pub positions: Vec<QueuePositionRes>,
}

impl From<Vec<QueuePosition>> for QueuePositionListRes {
    fn from(list: Vec<QueuePosition>) -> Self {
        QueuePositionListRes {
            positions: list
                .into_iter()
                .map(|p| QueuePositionRes {
                    entry_id: p.entry_id,
                    assessment_id: p.assessment_id,
                    department: p.department.map(|d| d.0),
                    position: p.position,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueStatsRes {
    pub waiting: usize,
    pub called: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Active entries per acuity level.
    pub by_level: Vec<LevelCountRes>,
    pub overdue: usize,
    pub urgent: usize,
    pub average_wait_minutes: Option<f64>,
    pub completed_today: usize,
}

impl From<QueueStats> for QueueStatsRes {
    fn from(s: QueueStats) -> Self {
        QueueStatsRes {
            waiting: s.waiting,
            called: s.called,
            in_progress: s.in_progress,
            completed: s.completed,
            by_level: level_counts(&s.by_level),
            overdue: s.overdue,
            urgent: s.urgent,
            average_wait_minutes: s.average_wait_minutes,
            completed_today: s.completed_today,
        }
    }
}

// ============================================================================
// Responses: protocols
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProtocolRes {
    #[schema(value_type = String)]
    pub id: ProtocolId,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    #[schema(value_type = u8)]
    pub level: AcuityLevel,
    #[schema(value_type = u8)]
    pub priority: Priority,
    #[schema(value_type = String)]
    pub valid_from: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub valid_to: Option<DateTime<Utc>>,
    pub criteria: Vec<CriterionDto>,
    #[schema(value_type = String)]
    pub match_mode: MatchMode,
    pub required_actions: Vec<String>,
    pub is_active: bool,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<TriageProtocol> for ProtocolRes {
    fn from(p: TriageProtocol) -> Self {
        ProtocolRes {
            id: p.id,
            name: p.name.as_str().to_string(),
            version: p.version.as_str().to_string(),
            description: p.description,
            level: p.level,
            priority: p.priority,
            valid_from: p.valid_from,
            valid_to: p.valid_to,
            criteria: p.criteria.into_iter().map(CriterionDto::from).collect(),
            match_mode: p.match_mode,
            required_actions: p.required_actions,
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProtocolListRes {
    pub protocols: Vec<ProtocolRes>,
}

impl From<Vec<TriageProtocol>> for ProtocolListRes {
    fn from(list: Vec<TriageProtocol>) -> Self {
        ProtocolListRes {
            protocols: list.into_iter().map(ProtocolRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProtocolApplicationRes {
    pub assessment: AssessmentRes,
    pub record: ReassessmentRes,
}

impl From<ProtocolApplication> for ProtocolApplicationRes {
    fn from(a: ProtocolApplication) -> Self {
        ProtocolApplicationRes {
            assessment: a.assessment.into(),
            record: a.record.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProtocolDeletedRes {
    #[schema(value_type = String)]
    pub protocol_id: ProtocolId,
}

// ============================================================================
// Responses: reports
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyReportRes {
    #[schema(value_type = String, example = "2026-03-02")]
    pub date: NaiveDate,
    pub department: Option<u64>,
    pub assessments_created: usize,
    pub by_level: Vec<LevelCountRes>,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub reassessments: usize,
    pub deteriorations: usize,
    pub protocol_applications: usize,
    pub average_triage_minutes: Option<f64>,
    pub queue_entries_enqueued: usize,
    pub queue_entries_called: usize,
    pub average_wait_minutes: Option<f64>,
}

impl From<DailyReport> for DailyReportRes {
    fn from(r: DailyReport) -> Self {
        DailyReportRes {
            date: r.date,
            department: r.department.map(|d| d.0),
            assessments_created: r.assessments_created,
            by_level: level_counts(&r.by_level),
            pending: r.by_status.pending,
            completed: r.by_status.completed,
            cancelled: r.by_status.cancelled,
            reassessments: r.reassessments,
            deteriorations: r.deteriorations,
            protocol_applications: r.protocol_applications,
            average_triage_minutes: r.average_triage_minutes,
            queue_entries_enqueued: r.queue_entries_enqueued,
            queue_entries_called: r.queue_entries_called,
            average_wait_minutes: r.average_wait_minutes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeeklyReportRes {
    #[schema(value_type = String)]
    pub week_start: NaiveDate,
    pub department: Option<u64>,
    pub days: Vec<DailyReportRes>,
    pub total_assessments: usize,
    pub total_reassessments: usize,
    pub total_deteriorations: usize,
    pub total_protocol_applications: usize,
    pub total_enqueued: usize,
    pub total_called: usize,
    #[schema(value_type = Option<String>)]
    pub busiest_day: Option<NaiveDate>,
    pub average_wait_minutes: Option<f64>,
}

impl From<WeeklyReport> for WeeklyReportRes {
    fn from(r: WeeklyReport) -> Self {
        WeeklyReportRes {
            week_start: r.week_start,
            department: r.department.map(|d| d.0),
            days: r.days.into_iter().map(DailyReportRes::from).collect(),
            total_assessments: r.total_assessments,
            total_reassessments: r.total_reassessments,
            total_deteriorations: r.total_deteriorations,
            total_protocol_applications: r.total_protocol_applications,
            total_enqueued: r.total_enqueued,
            total_called: r.total_called,
            busiest_day: r.busiest_day,
            average_wait_minutes: r.average_wait_minutes,
        }
    }
}
