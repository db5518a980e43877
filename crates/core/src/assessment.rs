//! Triage assessment lifecycle.
//!
//! An assessment is created `Pending` and open, and ends either `Completed` (with a
//! recommendation for the receiving department) or `Cancelled`. While it is open it can be
//! reassessed, receive further vital signs and have protocols applied; once closed it can only
//! be read. Acuity level only changes at creation or through an audited reassessment record.

use crate::acuity::{compute_level, compute_priority, AcuityLevel, Priority};
use crate::collaborators::NotificationKind;
use crate::constants::MAX_NOTES_LEN;
use crate::engine::EngineContext;
use crate::error::{TriageError, TriageResult};
use crate::queue::{
    commit_with_active_entry, waiting_position, EnqueueRequest, EntryUpdate, TriageQueueEntry,
};
use crate::store::{AssessmentFilter, ChangeSet, QueueFilter};
use crate::vitals::{VitalSigns, VitalSignsSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use triage_types::{
    AssessmentId, DepartmentId, DoctorId, NonEmptyText, PatientId, ProtocolId, ReassessmentId,
    UserId,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Pending,
    Completed,
    Cancelled,
}

impl AssessmentStatus {
    pub const ALL: [AssessmentStatus; 3] = [
        AssessmentStatus::Pending,
        AssessmentStatus::Completed,
        AssessmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Cancelled => "cancelled",
        }
    }
}

/// Isolation precautions required while the patient waits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationKind {
    Contact,
    Droplet,
    Airborne,
    Protective,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassessmentReason {
    Routine,
    Deterioration,
    Improvement,
    ProtocolDriven,
}

/// Link between an assessment and a protocol applied to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedProtocol {
    pub protocol_id: ProtocolId,
    pub protocol_name: String,
    pub applied_at: DateTime<Utc>,
    pub applied_by: UserId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub id: AssessmentId,
    pub patient_id: PatientId,
    pub assessor_id: UserId,
    pub chief_complaint: NonEmptyText,
    pub level: AcuityLevel,
    pub priority: Priority,
    pub notes: Option<String>,
    pub isolation: Option<IsolationKind>,
    pub arrived_at: DateTime<Utc>,
    pub triage_started_at: DateTime<Utc>,
    /// Set exactly when the assessment is completed.
    pub triage_ended_at: Option<DateTime<Utc>>,
    pub is_open: bool,
    pub status: AssessmentStatus,
    pub reassessment_count: u32,
    pub last_reassessed_at: Option<DateTime<Utc>>,
    pub recommended_department: Option<DepartmentId>,
    pub recommended_doctor: Option<DoctorId>,
    pub applied_protocols: Vec<AppliedProtocol>,
    pub cancellation_reason: Option<NonEmptyText>,
    pub is_deleted: bool,
}

impl TriageAssessment {
    /// Fails unless the assessment still accepts clinical changes.
    pub fn ensure_open(&self) -> TriageResult<()> {
        match self.status {
            AssessmentStatus::Cancelled => Err(TriageError::AssessmentCancelled(self.id)),
            AssessmentStatus::Completed => Err(TriageError::AssessmentClosed(self.id)),
            AssessmentStatus::Pending if !self.is_open => {
                Err(TriageError::AssessmentClosed(self.id))
            }
            AssessmentStatus::Pending => Ok(()),
        }
    }

    fn ensure_pending(&self) -> TriageResult<()> {
        match self.status {
            AssessmentStatus::Pending => Ok(()),
            AssessmentStatus::Completed => Err(TriageError::AssessmentAlreadyCompleted(self.id)),
            AssessmentStatus::Cancelled => Err(TriageError::AssessmentCancelled(self.id)),
        }
    }

    pub fn has_protocol(&self, protocol: ProtocolId) -> bool {
        self.applied_protocols
            .iter()
            .any(|p| p.protocol_id == protocol)
    }

    /// Time from start to end of triage, for completed assessments.
    pub fn triage_duration(&self) -> Option<chrono::Duration> {
        self.triage_ended_at.map(|end| end - self.triage_started_at)
    }
}

/// Append-only audit record of one acuity change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReassessmentRecord {
    pub id: ReassessmentId,
    pub assessment_id: AssessmentId,
    pub previous_level: AcuityLevel,
    pub new_level: AcuityLevel,
    pub previous_priority: Priority,
    pub new_priority: Priority,
    pub reason: ReassessmentReason,
    pub created_at: DateTime<Utc>,
    pub assessor_id: UserId,
    pub notes: Option<String>,
    pub protocol_id: Option<ProtocolId>,
}

impl ReassessmentRecord {
    /// True when the record moved the patient to a more severe level.
    pub fn is_deterioration(&self) -> bool {
        self.new_level.is_more_severe_than(self.previous_level)
    }
}

/// Input for [`AssessmentService::create`].
#[derive(Clone, Debug)]
pub struct NewAssessment {
    pub patient_id: PatientId,
    pub chief_complaint: String,
    pub vitals: VitalSigns,
    pub notes: Option<String>,
    /// Defaults to the time of creation.
    pub arrived_at: Option<DateTime<Utc>>,
    pub isolation: Option<IsolationKind>,
    pub target_department: Option<DepartmentId>,
    pub target_doctor: Option<DoctorId>,
}

/// Outcome recorded when an assessment is completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub department: Option<DepartmentId>,
    pub doctor: Option<DoctorId>,
}

/// Everything written by a successful [`AssessmentService::create`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatedAssessment {
    pub assessment: TriageAssessment,
    pub vital_signs: VitalSignsSnapshot,
    pub queue_entry: TriageQueueEntry,
}

/// Trims free text; blank becomes `None`.
pub(crate) fn normalise_notes(notes: Option<String>) -> TriageResult<Option<String>> {
    let Some(notes) = notes else {
        return Ok(None);
    };
    let trimmed = notes.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_NOTES_LEN {
        return Err(TriageError::InvalidInput(format!(
            "notes exceed {MAX_NOTES_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_owned()))
}

pub(crate) fn is_critical_level(level: AcuityLevel) -> bool {
    level <= AcuityLevel::Emergent
}

pub(crate) fn load_assessment(
    ctx: &EngineContext,
    id: AssessmentId,
) -> TriageResult<TriageAssessment> {
    ctx.store
        .find_assessment(id)?
        .ok_or(TriageError::AssessmentNotFound(id))
}

/// Assessment lifecycle operations.
#[derive(Clone)]
pub struct AssessmentService {
    ctx: Arc<EngineContext>,
}

impl AssessmentService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Triage a new arrival.
    ///
    /// Validates the request, classifies the vital signs and persists the assessment, its first
    /// vital-signs snapshot and its queue entry as one unit of work.
    ///
    /// # Errors
    ///
    /// - [`TriageError::Unauthorised`] if `caller` may not triage.
    /// - [`TriageError::PatientNotFound`] if the patient is unknown to the directory.
    /// - Validation errors for an empty complaint, implausible vital signs or an arrival time in
    ///   the future.
    pub fn create(&self, caller: UserId, request: NewAssessment) -> TriageResult<CreatedAssessment> {
        let ctx = &self.ctx;
        ctx.ensure_authorised(caller)?;
        if !ctx.patients.patient_exists(request.patient_id) {
            return Err(TriageError::PatientNotFound(request.patient_id));
        }

        let chief_complaint = NonEmptyText::new(&request.chief_complaint)?;
        let notes = normalise_notes(request.notes)?;
        request.vitals.validate()?;

        let now = ctx.now();
        let arrived_at = request.arrived_at.unwrap_or(now);
        if arrived_at > now {
            return Err(TriageError::InvalidInput(
                "arrival time cannot be in the future".into(),
            ));
        }

        let level = compute_level(&request.vitals);
        let priority = compute_priority(level, Some(&request.vitals));

        let assessment = TriageAssessment {
            id: AssessmentId::new(),
            patient_id: request.patient_id,
            assessor_id: caller,
            chief_complaint,
            level,
            priority,
            notes,
            isolation: request.isolation,
            arrived_at,
            triage_started_at: now,
            triage_ended_at: None,
            is_open: true,
            status: AssessmentStatus::Pending,
            reassessment_count: 0,
            last_reassessed_at: None,
            recommended_department: None,
            recommended_doctor: None,
            applied_protocols: Vec::new(),
            cancellation_reason: None,
            is_deleted: false,
        };
        let snapshot = VitalSignsSnapshot::new(assessment.id, now, caller, request.vitals);
        let placement = EnqueueRequest {
            priority: None,
            department: request.target_department,
            doctor: request.target_doctor,
        };

        let queue_entry = ctx.locks.queue.with_department(placement.department, || {
            let position = waiting_position(ctx, placement.department)?;
            let entry = TriageQueueEntry::new(
                &assessment,
                &placement,
                position,
                caller,
                now,
                ctx.cfg.sla(),
            );

            let mut changes = ChangeSet::new();
            changes
                .put_assessment(assessment.clone())
                .append_vital_signs(snapshot.clone())
                .put_queue_entry(entry.clone());
            ctx.store.commit(changes)?;
            Ok::<_, TriageError>(entry)
        })?;

        tracing::info!(
            assessment_id = %assessment.id,
            patient_id = %assessment.patient_id,
            level = assessment.level.number(),
            priority = assessment.priority.value(),
            "assessment created"
        );

        if is_critical_level(level) {
            ctx.notify(
                NotificationKind::CriticalArrival,
                format!(
                    "Level {} patient {} triaged: {}",
                    level, assessment.patient_id, assessment.chief_complaint
                ),
            );
        }

        Ok(CreatedAssessment {
            assessment,
            vital_signs: snapshot,
            queue_entry,
        })
    }

    /// Record a new acuity level for an open assessment.
    ///
    /// Priority is recomputed from the new level and the latest vital signs, and any active
    /// queue entry takes the new level, priority and reassessment deadline.
    pub fn reassess(
        &self,
        caller: UserId,
        id: AssessmentId,
        new_level: AcuityLevel,
        reason: ReassessmentReason,
        notes: Option<String>,
    ) -> TriageResult<ReassessmentRecord> {
        let ctx = &self.ctx;
        ctx.ensure_authorised(caller)?;
        let notes = normalise_notes(notes)?;

        let record = ctx.locks.assessments.with(id, || {
            let mut assessment = load_assessment(ctx, id)?;
            assessment.ensure_open()?;

            let now = ctx.now();
            let latest = ctx.store.latest_vital_signs(id)?;
            let new_priority = compute_priority(new_level, latest.as_ref().map(|s| &s.readings));

            let record = ReassessmentRecord {
                id: ReassessmentId::new(),
                assessment_id: id,
                previous_level: assessment.level,
                new_level,
                previous_priority: assessment.priority,
                new_priority,
                reason,
                created_at: now,
                assessor_id: caller,
                notes,
                protocol_id: None,
            };

            assessment.level = new_level;
            assessment.priority = new_priority;
            assessment.reassessment_count += 1;
            assessment.last_reassessed_at = Some(now);

            let mut changes = ChangeSet::new();
            changes
                .put_assessment(assessment.clone())
                .append_reassessment(record.clone());
            commit_with_active_entry(ctx, &assessment, EntryUpdate::Refresh, changes, now)?;
            Ok::<_, TriageError>(record)
        })?;

        tracing::info!(
            assessment_id = %id,
            from = record.previous_level.number(),
            to = record.new_level.number(),
            reason = ?record.reason,
            "assessment reassessed"
        );

        if is_critical_level(record.new_level) && record.is_deterioration() {
            ctx.notify(
                NotificationKind::Deterioration,
                format!(
                    "Assessment {} reassessed from level {} to level {}",
                    id, record.previous_level, record.new_level
                ),
            );
        }

        Ok(record)
    }

    /// Close a pending assessment with its recommendation and close any active queue entry.
    pub fn complete(
        &self,
        caller: UserId,
        id: AssessmentId,
        completion: Completion,
    ) -> TriageResult<TriageAssessment> {
        let ctx = &self.ctx;
        ctx.ensure_authorised(caller)?;

        let assessment = ctx.locks.assessments.with(id, || {
            let mut assessment = load_assessment(ctx, id)?;
            assessment.ensure_pending()?;

            let now = ctx.now();
            assessment.status = AssessmentStatus::Completed;
            assessment.is_open = false;
            assessment.triage_ended_at = Some(now);
            assessment.recommended_department = completion.department;
            assessment.recommended_doctor = completion.doctor;

            let mut changes = ChangeSet::new();
            changes.put_assessment(assessment.clone());
            commit_with_active_entry(ctx, &assessment, EntryUpdate::Close(caller), changes, now)?;
            Ok::<_, TriageError>(assessment)
        })?;

        tracing::info!(assessment_id = %id, "assessment completed");
        Ok(assessment)
    }

    /// Cancel a pending assessment, closing any active queue entry.
    pub fn cancel(
        &self,
        caller: UserId,
        id: AssessmentId,
        reason: &str,
    ) -> TriageResult<TriageAssessment> {
        let ctx = &self.ctx;
        ctx.ensure_authorised(caller)?;
        let reason = NonEmptyText::new(reason)?;

        let assessment = ctx.locks.assessments.with(id, || {
            let mut assessment = load_assessment(ctx, id)?;
            assessment.ensure_pending()?;

            let now = ctx.now();
            assessment.status = AssessmentStatus::Cancelled;
            assessment.is_open = false;
            assessment.cancellation_reason = Some(reason);

            let mut changes = ChangeSet::new();
            changes.put_assessment(assessment.clone());
            commit_with_active_entry(ctx, &assessment, EntryUpdate::Close(caller), changes, now)?;
            Ok::<_, TriageError>(assessment)
        })?;

        tracing::info!(assessment_id = %id, "assessment cancelled");
        Ok(assessment)
    }

    /// Append a vital-signs snapshot. Level and priority are left untouched.
    pub fn record_vital_signs(
        &self,
        caller: UserId,
        id: AssessmentId,
        vitals: VitalSigns,
    ) -> TriageResult<VitalSignsSnapshot> {
        let ctx = &self.ctx;
        ctx.ensure_authorised(caller)?;
        vitals.validate()?;

        ctx.locks.assessments.with(id, || {
            let assessment = load_assessment(ctx, id)?;
            assessment.ensure_open()?;

            let snapshot = VitalSignsSnapshot::new(id, ctx.now(), caller, vitals);
            let mut changes = ChangeSet::new();
            changes.append_vital_signs(snapshot.clone());
            ctx.store.commit(changes)?;

            tracing::info!(assessment_id = %id, snapshot_id = %snapshot.id, "vital signs recorded");
            Ok(snapshot)
        })
    }

    pub fn get(&self, id: AssessmentId) -> TriageResult<TriageAssessment> {
        load_assessment(&self.ctx, id)
    }

    /// Vital-signs snapshots, oldest first.
    pub fn vital_signs(&self, id: AssessmentId) -> TriageResult<Vec<VitalSignsSnapshot>> {
        load_assessment(&self.ctx, id)?;
        Ok(self.ctx.store.vital_signs_for(id)?)
    }

    /// Reassessment history, oldest first.
    pub fn reassessments(&self, id: AssessmentId) -> TriageResult<Vec<ReassessmentRecord>> {
        load_assessment(&self.ctx, id)?;
        Ok(self.ctx.store.reassessments_for(id)?)
    }

    /// Open assessments, optionally only those queued for `department`.
    pub fn list_open(
        &self,
        department: Option<DepartmentId>,
    ) -> TriageResult<Vec<TriageAssessment>> {
        let open = self.ctx.store.list_assessments(&AssessmentFilter {
            open: Some(true),
            ..Default::default()
        })?;

        let Some(department) = department else {
            return Ok(open);
        };

        let queued: HashSet<AssessmentId> = self
            .ctx
            .store
            .list_queue_entries(&QueueFilter {
                department: Some(department),
                ..Default::default()
            })?
            .into_iter()
            .filter(|e| e.is_active())
            .map(|e| e.assessment_id)
            .collect();

        Ok(open
            .into_iter()
            .filter(|a| queued.contains(&a.id))
            .collect())
    }

    /// Completed assessments ready for hand-off to reception, optionally for one department.
    pub fn completed_for_admission(
        &self,
        department: Option<DepartmentId>,
    ) -> TriageResult<Vec<TriageAssessment>> {
        let completed = self.ctx.store.list_assessments(&AssessmentFilter {
            status: Some(AssessmentStatus::Completed),
            ..Default::default()
        })?;

        Ok(completed
            .into_iter()
            .filter(|a| department.map_or(true, |d| a.recommended_department == Some(d)))
            .collect())
    }

    /// True if reception may link the assessment to a visit.
    pub fn can_link_to_reception(&self, id: AssessmentId) -> TriageResult<bool> {
        let assessment = load_assessment(&self.ctx, id)?;
        Ok(assessment.status == AssessmentStatus::Completed && !assessment.is_open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Clock, NotificationKind};
    use crate::queue::QueueStatus;
    use crate::test_support::{
        critical_vitals, fixture, intake, sample_vitals, urgent_vitals, NURSE, OUTSIDER,
    };
    use chrono::Duration;

    #[test]
    fn test_create_persists_assessment_snapshot_and_entry() {
        let fx = fixture();
        let created = fx
            .engine
            .assessments()
            .create(NURSE, intake(42, urgent_vitals()))
            .unwrap();

        assert_eq!(created.assessment.level, AcuityLevel::Urgent);
        assert_eq!(created.assessment.status, AssessmentStatus::Pending);
        assert!(created.assessment.is_open);
        assert_eq!(created.queue_entry.status, QueueStatus::Waiting);
        assert_eq!(created.queue_entry.position, 1);
        assert_eq!(
            created.queue_entry.next_reassessment_due_at,
            Some(fx.clock.now() + Duration::minutes(30))
        );

        let service = fx.engine.assessments();
        assert_eq!(service.vital_signs(created.assessment.id).unwrap().len(), 1);
        assert!(fx.notifier.sent().is_empty());
    }

    #[test]
    fn test_create_critical_patient_matches_worked_example() {
        let fx = fixture();
        let created = fx
            .engine
            .assessments()
            .create(NURSE, intake(42, critical_vitals()))
            .unwrap();

        assert_eq!(created.assessment.level, AcuityLevel::Resuscitation);
        assert_eq!(created.assessment.priority, Priority::HIGHEST);
        assert!(created.queue_entry.requires_immediate_care);
        assert_eq!(created.queue_entry.next_reassessment_due_at, None);

        let sent = fx.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::CriticalArrival);
    }

    #[test]
    fn test_create_rejects_unauthorised_and_unknown_patient() {
        let fx = fixture();
        let service = fx.engine.assessments();

        let err = service
            .create(OUTSIDER, intake(42, sample_vitals()))
            .unwrap_err();
        assert!(matches!(err, TriageError::Unauthorised(_)));

        let err = service
            .create(NURSE, intake(9_999, sample_vitals()))
            .unwrap_err();
        assert!(matches!(err, TriageError::PatientNotFound(_)));
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let fx = fixture();
        let service = fx.engine.assessments();

        let mut blank = intake(42, sample_vitals());
        blank.chief_complaint = "   ".into();
        assert!(matches!(
            service.create(NURSE, blank).unwrap_err(),
            TriageError::InvalidText(_)
        ));

        let empty_vitals = intake(42, VitalSigns::default());
        assert!(matches!(
            service.create(NURSE, empty_vitals).unwrap_err(),
            TriageError::InvalidVitalSigns(_)
        ));

        let mut future = intake(42, sample_vitals());
        future.arrived_at = Some(fx.clock.now() + Duration::minutes(5));
        assert!(service.create(NURSE, future).is_err());

        assert!(service.list_open(None).unwrap().is_empty());
    }

    #[test]
    fn test_reassess_updates_level_priority_and_entry() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, sample_vitals())).unwrap();
        let id = created.assessment.id;

        fx.clock.advance(Duration::minutes(10));
        let record = service
            .reassess(NURSE, id, AcuityLevel::Emergent, ReassessmentReason::Deterioration, None)
            .unwrap();
        assert_eq!(record.previous_level, AcuityLevel::NonUrgent);
        assert_eq!(record.new_level, AcuityLevel::Emergent);
        assert!(record.is_deterioration());

        let assessment = service.get(id).unwrap();
        assert_eq!(assessment.level, AcuityLevel::Emergent);
        assert_eq!(assessment.priority, Priority::from(AcuityLevel::Emergent));
        assert_eq!(assessment.reassessment_count, 1);
        assert_eq!(assessment.last_reassessed_at, Some(fx.clock.now()));

        let entry = fx.engine.queue().active_for(id).unwrap().unwrap();
        assert_eq!(entry.level, AcuityLevel::Emergent);
        assert_eq!(entry.priority, assessment.priority);
        assert_eq!(
            entry.next_reassessment_due_at,
            Some(fx.clock.now() + Duration::minutes(15))
        );

        assert_eq!(service.reassessments(id).unwrap(), vec![record]);
        let kinds: Vec<_> = fx.notifier.sent().into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Deterioration]);
    }

    #[test]
    fn test_improvement_to_emergent_sends_no_deterioration_alert() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, critical_vitals())).unwrap();
        assert_eq!(created.assessment.level, AcuityLevel::Resuscitation);
        let before = fx.notifier.sent().len();

        let record = service
            .reassess(
                NURSE,
                created.assessment.id,
                AcuityLevel::Emergent,
                ReassessmentReason::Improvement,
                None,
            )
            .unwrap();
        assert!(!record.is_deterioration());

        let after = fx.notifier.sent();
        assert_eq!(after.len(), before);
        assert!(after
            .iter()
            .all(|n| n.kind != NotificationKind::Deterioration));
    }

    #[test]
    fn test_record_vital_signs_never_changes_level() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, sample_vitals())).unwrap();
        let id = created.assessment.id;

        fx.clock.advance(Duration::minutes(1));
        service
            .record_vital_signs(NURSE, id, critical_vitals())
            .unwrap();

        let assessment = service.get(id).unwrap();
        assert_eq!(assessment.level, created.assessment.level);
        assert_eq!(assessment.priority, created.assessment.priority);
        assert_eq!(service.vital_signs(id).unwrap().len(), 2);
    }

    #[test]
    fn test_reassess_uses_latest_vitals_for_priority() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, sample_vitals())).unwrap();
        let id = created.assessment.id;

        fx.clock.advance(Duration::minutes(1));
        service
            .record_vital_signs(NURSE, id, critical_vitals())
            .unwrap();
        let record = service
            .reassess(NURSE, id, AcuityLevel::Urgent, ReassessmentReason::Routine, None)
            .unwrap();
        // Desaturation escalates level 3 by one step.
        assert_eq!(record.new_priority.value(), 2);
    }

    #[test]
    fn test_complete_closes_assessment_and_queue() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, sample_vitals())).unwrap();
        let id = created.assessment.id;

        fx.clock.advance(Duration::minutes(20));
        let completed = service
            .complete(
                NURSE,
                id,
                Completion {
                    department: Some(DepartmentId(4)),
                    doctor: Some(DoctorId(8)),
                },
            )
            .unwrap();

        assert_eq!(completed.status, AssessmentStatus::Completed);
        assert!(!completed.is_open);
        assert_eq!(completed.triage_ended_at, Some(fx.clock.now()));
        assert_eq!(completed.triage_duration(), Some(Duration::minutes(20)));
        assert!(fx.engine.queue().active_for(id).unwrap().is_none());

        assert!(service.can_link_to_reception(id).unwrap());
        assert_eq!(
            service
                .completed_for_admission(Some(DepartmentId(4)))
                .unwrap()
                .len(),
            1
        );
        assert!(service
            .completed_for_admission(Some(DepartmentId(5)))
            .unwrap()
            .is_empty());

        let err = service.complete(NURSE, id, Completion::default()).unwrap_err();
        assert!(matches!(err, TriageError::AssessmentAlreadyCompleted(_)));
    }

    #[test]
    fn test_closed_assessment_rejects_changes() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, sample_vitals())).unwrap();
        let id = created.assessment.id;
        service.cancel(NURSE, id, "left before being seen").unwrap();

        let err = service
            .reassess(NURSE, id, AcuityLevel::Urgent, ReassessmentReason::Routine, None)
            .unwrap_err();
        assert!(matches!(err, TriageError::AssessmentCancelled(_)));
        assert!(service
            .record_vital_signs(NURSE, id, sample_vitals())
            .is_err());
        assert!(!service.can_link_to_reception(id).unwrap());
        assert!(service.complete(NURSE, id, Completion::default()).is_err());

        let cancelled = service.get(id).unwrap();
        assert_eq!(
            cancelled.cancellation_reason.as_ref().map(|r| r.as_str()),
            Some("left before being seen")
        );
        assert_eq!(cancelled.triage_ended_at, None);
    }

    #[test]
    fn test_cancel_requires_reason() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let created = service.create(NURSE, intake(42, sample_vitals())).unwrap();
        assert!(service.cancel(NURSE, created.assessment.id, " ").is_err());
        assert!(service.get(created.assessment.id).unwrap().is_open);
    }

    #[test]
    fn test_list_open_filters_by_department() {
        let fx = fixture();
        let service = fx.engine.assessments();
        let mut cardiology = intake(1, sample_vitals());
        cardiology.target_department = Some(DepartmentId(2));
        service.create(NURSE, cardiology).unwrap();
        service.create(NURSE, intake(2, sample_vitals())).unwrap();

        assert_eq!(service.list_open(None).unwrap().len(), 2);
        assert_eq!(service.list_open(Some(DepartmentId(2))).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_assessment_is_not_found() {
        let fx = fixture();
        let err = fx.engine.assessments().get(AssessmentId::new()).unwrap_err();
        assert!(matches!(err, TriageError::AssessmentNotFound(_)));
    }
}
