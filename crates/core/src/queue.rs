//! Department-scoped dispatch queues.
//!
//! Each assessment has at most one active (non-terminal) entry at a time. Waiting entries are
//! dispatched in a fixed total order: immediate-care entries first, then by priority, then by
//! enqueue time, then by entry id. Positions are dense ranks within a department partition and
//! are only rewritten by [`QueueService::reorder_by_priority`]; new entries join at the back.

use crate::acuity::{AcuityLevel, Priority, SlaPolicy};
use crate::assessment::{load_assessment, TriageAssessment};
use crate::constants::URGENT_PRIORITY_THRESHOLD;
use crate::engine::EngineContext;
use crate::error::{TriageError, TriageResult};
use crate::store::{ChangeSet, QueueFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use triage_types::{AssessmentId, DepartmentId, DoctorId, PatientId, QueueEntryId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Called,
    InProgress,
    Completed,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 4] = [
        QueueStatus::Waiting,
        QueueStatus::Called,
        QueueStatus::InProgress,
        QueueStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Called => "called",
            QueueStatus::InProgress => "in_progress",
            QueueStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == QueueStatus::Completed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageQueueEntry {
    pub id: QueueEntryId,
    pub assessment_id: AssessmentId,
    pub patient_id: PatientId,
    pub priority: Priority,
    pub level: AcuityLevel,
    pub requires_immediate_care: bool,
    /// Dense rank among waiting entries of the same department, starting at 1.
    pub position: u32,
    pub queued_at: DateTime<Utc>,
    pub queued_by: UserId,
    pub target_department: Option<DepartmentId>,
    pub target_doctor: Option<DoctorId>,
    /// Absent for level 1, which is not on a timer.
    pub next_reassessment_due_at: Option<DateTime<Utc>>,
    pub status: QueueStatus,
    pub called_at: Option<DateTime<Utc>>,
    pub called_by: Option<UserId>,
    pub started_at: Option<DateTime<Utc>>,
    pub started_by: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<UserId>,
}

impl TriageQueueEntry {
    pub(crate) fn new(
        assessment: &TriageAssessment,
        request: &EnqueueRequest,
        position: u32,
        queued_by: UserId,
        queued_at: DateTime<Utc>,
        sla: &SlaPolicy,
    ) -> Self {
        Self {
            id: QueueEntryId::new(),
            assessment_id: assessment.id,
            patient_id: assessment.patient_id,
            priority: request.priority.unwrap_or(assessment.priority),
            level: assessment.level,
            requires_immediate_care: assessment.level.requires_immediate_care(),
            position,
            queued_at,
            queued_by,
            target_department: request.department,
            target_doctor: request.doctor,
            next_reassessment_due_at: sla.due_at(assessment.level, queued_at),
            status: QueueStatus::Waiting,
            called_at: None,
            called_by: None,
            started_at: None,
            started_by: None,
            completed_at: None,
            completed_by: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Waiting with its reassessment deadline reached. The deadline instant itself counts.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueStatus::Waiting
            && self.next_reassessment_due_at.is_some_and(|due| due <= now)
    }

    /// Waiting and either high priority or in need of immediate care.
    pub fn is_urgent(&self) -> bool {
        self.status == QueueStatus::Waiting
            && (self.priority.value() <= URGENT_PRIORITY_THRESHOLD || self.requires_immediate_care)
    }

    /// Time spent waiting before being called.
    pub fn wait_time(&self) -> Option<chrono::Duration> {
        self.called_at.map(|called| called - self.queued_at)
    }
}

/// Total dispatch order: immediate care, priority, enqueue time, id.
pub fn dispatch_order(a: &TriageQueueEntry, b: &TriageQueueEntry) -> Ordering {
    (!a.requires_immediate_care, a.priority, a.queued_at, a.id).cmp(&(
        !b.requires_immediate_care,
        b.priority,
        b.queued_at,
        b.id,
    ))
}

/// Placement for a new queue entry. Unset priority falls back to the assessment's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub priority: Option<Priority>,
    pub department: Option<DepartmentId>,
    pub doctor: Option<DoctorId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    pub entry_id: QueueEntryId,
    pub assessment_id: AssessmentId,
    pub department: Option<DepartmentId>,
    pub position: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub called: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Active entries per acuity level number.
    pub by_level: BTreeMap<u8, usize>,
    pub overdue: usize,
    pub urgent: usize,
    /// Mean of `called_at - queued_at` over entries that have been called.
    pub average_wait_minutes: Option<f64>,
    pub completed_today: usize,
}

/// Mean wait in minutes over entries that have been called.
pub(crate) fn average_wait_minutes<'a>(
    entries: impl IntoIterator<Item = &'a TriageQueueEntry>,
) -> Option<f64> {
    let waits: Vec<i64> = entries
        .into_iter()
        .filter_map(|e| e.wait_time())
        .map(|w| w.num_seconds())
        .collect();
    if waits.is_empty() {
        return None;
    }
    let total: i64 = waits.iter().sum();
    Some(total as f64 / waits.len() as f64 / 60.0)
}

/// Position a new entry takes in `department`: one past the last waiting entry. Caller holds
/// the department lock.
pub(crate) fn waiting_position(
    ctx: &EngineContext,
    department: Option<DepartmentId>,
) -> TriageResult<u32> {
    let last = ctx
        .store
        .list_queue_entries(&QueueFilter::waiting_in(department))?
        .into_iter()
        .filter(|e| e.target_department == department)
        .map(|e| e.position)
        .max()
        .unwrap_or(0);
    Ok(last.saturating_add(1))
}

/// What happens to an assessment's active entry alongside an assessment change.
#[derive(Clone, Copy, Debug)]
pub(crate) enum EntryUpdate {
    /// Take the assessment's level and priority and restart the reassessment timer.
    Refresh,
    /// Close the entry on behalf of the given user.
    Close(UserId),
}

/// Commits `changes` together with `update` applied to the assessment's active entry.
///
/// The caller holds the assessment lock, so no entry can become active for the assessment in
/// the meantime. The entry itself is re-read under its department lock because dispatch may
/// have moved it on since it was first read.
pub(crate) fn commit_with_active_entry(
    ctx: &EngineContext,
    assessment: &TriageAssessment,
    update: EntryUpdate,
    mut changes: ChangeSet,
    now: DateTime<Utc>,
) -> TriageResult<Option<TriageQueueEntry>> {
    let Some(active) = ctx.store.active_entry_for(assessment.id)? else {
        ctx.store.commit(changes)?;
        return Ok(None);
    };

    ctx.locks
        .queue
        .with_department(active.target_department, || {
            let Some(mut entry) = ctx
                .store
                .find_queue_entry(active.id)?
                .filter(TriageQueueEntry::is_active)
            else {
                ctx.store.commit(changes)?;
                return Ok(None);
            };

            match update {
                EntryUpdate::Refresh => {
                    entry.level = assessment.level;
                    entry.priority = assessment.priority;
                    entry.requires_immediate_care = assessment.level.requires_immediate_care();
                    entry.next_reassessment_due_at = ctx.cfg.sla().due_at(assessment.level, now);
                }
                EntryUpdate::Close(by) => {
                    entry.status = QueueStatus::Completed;
                    entry.completed_at = Some(now);
                    entry.completed_by = Some(by);
                }
            }

            changes.put_queue_entry(entry.clone());
            ctx.store.commit(changes)?;
            tracing::debug!(entry_id = %entry.id, ?update, "active queue entry updated");
            Ok(Some(entry))
        })
}

fn load_entry(ctx: &EngineContext, id: QueueEntryId) -> TriageResult<TriageQueueEntry> {
    ctx.store
        .find_queue_entry(id)?
        .ok_or(TriageError::QueueEntryNotFound(id))
}

/// Dispatch queue operations.
#[derive(Clone)]
pub struct QueueService {
    ctx: Arc<EngineContext>,
}

impl QueueService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Put an open assessment back in a queue.
    ///
    /// # Errors
    ///
    /// - [`TriageError::AssessmentNotFound`] if the assessment does not exist.
    /// - [`TriageError::AssessmentClosed`] / [`TriageError::AssessmentCancelled`] if it is closed.
    /// - [`TriageError::ActiveQueueEntryExists`] if it is already queued.
    pub fn enqueue(
        &self,
        caller: UserId,
        assessment_id: AssessmentId,
        request: EnqueueRequest,
    ) -> TriageResult<TriageQueueEntry> {
        let ctx = &self.ctx;
        ctx.locks.assessments.with(assessment_id, || {
            let assessment = load_assessment(ctx, assessment_id)?;
            assessment.ensure_open()?;

            if let Some(active) = ctx.store.active_entry_for(assessment_id)? {
                tracing::warn!(%assessment_id, entry_id = %active.id, "assessment already queued");
                return Err(TriageError::ActiveQueueEntryExists {
                    assessment_id,
                    entry_id: active.id,
                });
            }

            let entry = ctx.locks.queue.with_department(request.department, || {
                let position = waiting_position(ctx, request.department)?;
                let entry = TriageQueueEntry::new(
                    &assessment,
                    &request,
                    position,
                    caller,
                    ctx.now(),
                    ctx.cfg.sla(),
                );
                let mut changes = ChangeSet::new();
                changes.put_queue_entry(entry.clone());
                ctx.store.commit(changes)?;
                Ok::<_, TriageError>(entry)
            })?;

            tracing::info!(
                %assessment_id,
                entry_id = %entry.id,
                priority = entry.priority.value(),
                "assessment enqueued"
            );
            Ok(entry)
        })
    }

    /// Call the next waiting patient.
    ///
    /// Returns `Ok(None)` when nothing is waiting. Concurrent callers never receive the same
    /// entry.
    pub fn call_next(
        &self,
        caller: UserId,
        department: Option<DepartmentId>,
    ) -> TriageResult<Option<TriageQueueEntry>> {
        let ctx = &self.ctx;
        ctx.locks.queue.with_scope(department, || {
            let waiting = ctx
                .store
                .list_queue_entries(&QueueFilter::waiting_in(department))?;
            let Some(mut next) = waiting.into_iter().min_by(dispatch_order) else {
                tracing::debug!(?department, "no waiting entries");
                return Ok(None);
            };

            next.status = QueueStatus::Called;
            next.called_at = Some(ctx.now());
            next.called_by = Some(caller);

            let mut changes = ChangeSet::new();
            changes.put_queue_entry(next.clone());
            ctx.store.commit(changes)?;

            tracing::info!(
                entry_id = %next.id,
                assessment_id = %next.assessment_id,
                priority = next.priority.value(),
                "queue entry called"
            );
            Ok(Some(next))
        })
    }

    /// Move a called entry into progress.
    pub fn start(&self, caller: UserId, id: QueueEntryId) -> TriageResult<TriageQueueEntry> {
        self.transition(id, |entry, now| {
            if entry.status != QueueStatus::Called {
                return Err(TriageError::InvalidQueueTransition {
                    id,
                    from: entry.status.as_str(),
                    to: QueueStatus::InProgress.as_str(),
                });
            }
            entry.status = QueueStatus::InProgress;
            entry.started_at = Some(now);
            entry.started_by = Some(caller);
            Ok(())
        })
    }

    /// Close any non-terminal entry.
    pub fn complete(&self, caller: UserId, id: QueueEntryId) -> TriageResult<TriageQueueEntry> {
        self.transition(id, |entry, now| {
            if entry.status.is_terminal() {
                return Err(TriageError::QueueEntryClosed(id));
            }
            entry.status = QueueStatus::Completed;
            entry.completed_at = Some(now);
            entry.completed_by = Some(caller);
            Ok(())
        })
    }

    fn transition(
        &self,
        id: QueueEntryId,
        apply: impl FnOnce(&mut TriageQueueEntry, DateTime<Utc>) -> TriageResult<()>,
    ) -> TriageResult<TriageQueueEntry> {
        let ctx = &self.ctx;
        let department = load_entry(ctx, id)?.target_department;

        ctx.locks.queue.with_department(department, || {
            let mut entry = load_entry(ctx, id)?;
            let from = entry.status;
            if let Err(err) = apply(&mut entry, ctx.now()) {
                tracing::warn!(entry_id = %id, error = %err, "queue transition rejected");
                return Err(err);
            }

            let mut changes = ChangeSet::new();
            changes.put_queue_entry(entry.clone());
            ctx.store.commit(changes)?;

            tracing::info!(
                entry_id = %id,
                from = from.as_str(),
                to = entry.status.as_str(),
                "queue entry transitioned"
            );
            Ok(entry)
        })
    }

    /// Close the assessment's active entry if it has one. Succeeds as a no-op otherwise.
    pub fn close_active_if_any(
        &self,
        caller: UserId,
        assessment_id: AssessmentId,
    ) -> TriageResult<Option<TriageQueueEntry>> {
        let ctx = &self.ctx;
        ctx.locks.assessments.with(assessment_id, || {
            let assessment = load_assessment(ctx, assessment_id)?;
            commit_with_active_entry(
                ctx,
                &assessment,
                EntryUpdate::Close(caller),
                ChangeSet::new(),
                ctx.now(),
            )
        })
    }

    /// Rewrite positions of waiting entries as dense ranks in dispatch order.
    ///
    /// Ranks are computed per department partition. Priorities are never changed, and running
    /// it twice in a row writes nothing the second time.
    pub fn reorder_by_priority(
        &self,
        department: Option<DepartmentId>,
    ) -> TriageResult<Vec<QueuePosition>> {
        let ctx = &self.ctx;
        ctx.locks.queue.with_scope(department, || {
            let waiting = ctx
                .store
                .list_queue_entries(&QueueFilter::waiting_in(department))?;

            let mut partitions: BTreeMap<Option<DepartmentId>, Vec<TriageQueueEntry>> =
                BTreeMap::new();
            for entry in waiting {
                partitions
                    .entry(entry.target_department)
                    .or_default()
                    .push(entry);
            }

            let mut changes = ChangeSet::new();
            let mut positions = Vec::new();
            for (partition, mut entries) in partitions {
                entries.sort_by(dispatch_order);
                for (rank, mut entry) in (1u32..).zip(entries) {
                    positions.push(QueuePosition {
                        entry_id: entry.id,
                        assessment_id: entry.assessment_id,
                        department: partition,
                        position: rank,
                    });
                    if entry.position != rank {
                        entry.position = rank;
                        changes.put_queue_entry(entry);
                    }
                }
            }

            let moved = changes.queue_entries.len();
            ctx.store.commit(changes)?;
            tracing::info!(?department, moved, "queue reordered");
            Ok(positions)
        })
    }

    /// Waiting entries in dispatch order.
    pub fn waiting(&self, department: Option<DepartmentId>) -> TriageResult<Vec<TriageQueueEntry>> {
        let mut waiting = self
            .ctx
            .store
            .list_queue_entries(&QueueFilter::waiting_in(department))?;
        waiting.sort_by(dispatch_order);
        Ok(waiting)
    }

    /// Waiting entries whose reassessment deadline has been reached.
    pub fn overdue(&self, department: Option<DepartmentId>) -> TriageResult<Vec<TriageQueueEntry>> {
        let now = self.ctx.now();
        Ok(self
            .waiting(department)?
            .into_iter()
            .filter(|e| e.is_overdue(now))
            .collect())
    }

    pub fn urgent(&self, department: Option<DepartmentId>) -> TriageResult<Vec<TriageQueueEntry>> {
        Ok(self
            .waiting(department)?
            .into_iter()
            .filter(TriageQueueEntry::is_urgent)
            .collect())
    }

    pub fn stats(&self, department: Option<DepartmentId>) -> TriageResult<QueueStats> {
        let now = self.ctx.now();
        let entries = self.ctx.store.list_queue_entries(&QueueFilter {
            department,
            ..Default::default()
        })?;
        let today = now.date_naive();

        let mut stats = QueueStats::default();
        for entry in &entries {
            match entry.status {
                QueueStatus::Waiting => stats.waiting += 1,
                QueueStatus::Called => stats.called += 1,
                QueueStatus::InProgress => stats.in_progress += 1,
                QueueStatus::Completed => stats.completed += 1,
            }
            if entry.is_active() {
                *stats.by_level.entry(entry.level.number()).or_default() += 1;
            }
            if entry.is_overdue(now) {
                stats.overdue += 1;
            }
            if entry.is_urgent() {
                stats.urgent += 1;
            }
            if entry
                .completed_at
                .is_some_and(|at| at.date_naive() == today)
            {
                stats.completed_today += 1;
            }
        }
        stats.average_wait_minutes = average_wait_minutes(&entries);

        tracing::debug!(?department, total = entries.len(), "queue stats computed");
        Ok(stats)
    }

    pub fn get(&self, id: QueueEntryId) -> TriageResult<TriageQueueEntry> {
        load_entry(&self.ctx, id)
    }

    pub fn active_for(&self, assessment_id: AssessmentId) -> TriageResult<Option<TriageQueueEntry>> {
        Ok(self.ctx.store.active_entry_for(assessment_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Clock;
    use crate::assessment::Completion;
    use crate::test_support::{
        critical_vitals, fixture, intake, sample_vitals, urgent_vitals, vitals_with_priority,
        Fixture, NURSE,
    };
    use chrono::Duration;
    use std::collections::HashSet;
    use std::thread;

    fn admit(fx: &Fixture, patient: u64, department: Option<DepartmentId>) -> TriageQueueEntry {
        let mut request = intake(patient, urgent_vitals());
        request.target_department = department;
        fx.engine
            .assessments()
            .create(NURSE, request)
            .unwrap()
            .queue_entry
    }

    #[test]
    fn test_call_next_orders_by_priority() {
        let fx = fixture();
        let assessments = fx.engine.assessments();
        for (patient, priority) in [(1, 3), (2, 1), (3, 2)] {
            assessments
                .create(NURSE, intake(patient, vitals_with_priority(priority)))
                .unwrap();
            fx.clock.advance(Duration::seconds(1));
        }

        let queue = fx.engine.queue();
        let called: Vec<u8> = (0..3)
            .map(|_| queue.call_next(NURSE, None).unwrap().unwrap().priority.value())
            .collect();
        assert_eq!(called, vec![1, 2, 3]);
        assert!(queue.call_next(NURSE, None).unwrap().is_none());
    }

    #[test]
    fn test_ties_break_by_enqueue_time() {
        let fx = fixture();
        let first = admit(&fx, 1, None);
        fx.clock.advance(Duration::seconds(5));
        admit(&fx, 2, None);

        let called = fx.engine.queue().call_next(NURSE, None).unwrap().unwrap();
        assert_eq!(called.id, first.id);
        assert_eq!(called.status, QueueStatus::Called);
        assert_eq!(called.called_by, Some(NURSE));
        assert_eq!(called.called_at, Some(fx.clock.now()));
    }

    #[test]
    fn test_critical_patient_is_called_before_earlier_arrivals() {
        let fx = fixture();
        for patient in 1..=3 {
            admit(&fx, patient, None);
            fx.clock.advance(Duration::minutes(1));
        }
        let critical = fx
            .engine
            .assessments()
            .create(NURSE, intake(42, critical_vitals()))
            .unwrap();

        let called = fx.engine.queue().call_next(NURSE, None).unwrap().unwrap();
        assert_eq!(called.assessment_id, critical.assessment.id);
    }

    #[test]
    fn test_call_next_respects_department() {
        let fx = fixture();
        admit(&fx, 1, Some(DepartmentId(1)));
        let cardiology = admit(&fx, 2, Some(DepartmentId(2)));

        let queue = fx.engine.queue();
        let called = queue.call_next(NURSE, Some(DepartmentId(2))).unwrap().unwrap();
        assert_eq!(called.id, cardiology.id);
        assert!(queue.call_next(NURSE, Some(DepartmentId(2))).unwrap().is_none());
        assert!(queue.call_next(NURSE, Some(DepartmentId(1))).unwrap().is_some());
    }

    #[test]
    fn test_enqueue_rejects_second_active_entry() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        let err = fx
            .engine
            .queue()
            .enqueue(NURSE, entry.assessment_id, EnqueueRequest::default())
            .unwrap_err();
        assert!(matches!(err, TriageError::ActiveQueueEntryExists { .. }));
    }

    #[test]
    fn test_enqueue_after_close_uses_override_priority() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        let queue = fx.engine.queue();
        queue.complete(NURSE, entry.id).unwrap();

        let request = EnqueueRequest {
            priority: Some(Priority::new(4).unwrap()),
            department: Some(DepartmentId(9)),
            doctor: Some(DoctorId(3)),
        };
        let requeued = queue.enqueue(NURSE, entry.assessment_id, request).unwrap();
        assert_eq!(requeued.priority.value(), 4);
        assert_eq!(requeued.target_department, Some(DepartmentId(9)));
        assert_eq!(requeued.position, 1);
    }

    #[test]
    fn test_enqueue_closed_assessment_is_rejected() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        fx.engine
            .assessments()
            .complete(NURSE, entry.assessment_id, Completion::default())
            .unwrap();
        let err = fx
            .engine
            .queue()
            .enqueue(NURSE, entry.assessment_id, EnqueueRequest::default())
            .unwrap_err();
        assert!(matches!(err, TriageError::AssessmentClosed(_)));
    }

    #[test]
    fn test_sla_due_and_overdue_boundary() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        let queued_at = fx.clock.now();
        assert_eq!(
            entry.next_reassessment_due_at,
            Some(queued_at + Duration::minutes(30))
        );

        let queue = fx.engine.queue();
        fx.clock.set(queued_at + Duration::minutes(29));
        assert!(queue.overdue(None).unwrap().is_empty());

        fx.clock.set(queued_at + Duration::minutes(30));
        assert_eq!(queue.overdue(None).unwrap().len(), 1);

        queue.call_next(NURSE, None).unwrap();
        assert!(queue.overdue(None).unwrap().is_empty());
    }

    #[test]
    fn test_level_one_is_never_overdue_but_is_urgent() {
        let fx = fixture();
        fx.engine
            .assessments()
            .create(NURSE, intake(42, critical_vitals()))
            .unwrap();
        fx.clock.advance(Duration::hours(12));

        let queue = fx.engine.queue();
        assert!(queue.overdue(None).unwrap().is_empty());
        assert_eq!(queue.urgent(None).unwrap().len(), 1);
    }

    #[test]
    fn test_start_and_complete_transitions() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        let queue = fx.engine.queue();

        let err = queue.start(NURSE, entry.id).unwrap_err();
        assert!(matches!(err, TriageError::InvalidQueueTransition { .. }));

        queue.call_next(NURSE, None).unwrap();
        let started = queue.start(NURSE, entry.id).unwrap();
        assert_eq!(started.status, QueueStatus::InProgress);

        let completed = queue.complete(NURSE, entry.id).unwrap();
        assert_eq!(completed.status, QueueStatus::Completed);
        assert_eq!(completed.completed_by, Some(NURSE));

        let err = queue.complete(NURSE, entry.id).unwrap_err();
        assert!(matches!(err, TriageError::QueueEntryClosed(_)));
    }

    #[test]
    fn test_close_active_if_any_is_idempotent() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        let queue = fx.engine.queue();

        let closed = queue.close_active_if_any(NURSE, entry.assessment_id).unwrap();
        assert_eq!(closed.map(|e| e.id), Some(entry.id));
        assert!(queue
            .close_active_if_any(NURSE, entry.assessment_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_completion_closes_queue_and_close_is_noop() {
        let fx = fixture();
        let entry = admit(&fx, 1, None);
        fx.engine
            .assessments()
            .complete(NURSE, entry.assessment_id, Completion::default())
            .unwrap();

        let queue = fx.engine.queue();
        assert_eq!(queue.get(entry.id).unwrap().status, QueueStatus::Completed);
        assert!(queue
            .close_active_if_any(NURSE, entry.assessment_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_reorder_is_dense_and_idempotent() {
        let fx = fixture();
        let assessments = fx.engine.assessments();
        for (patient, priority) in [(1, 5), (2, 2), (3, 3)] {
            assessments
                .create(NURSE, intake(patient, vitals_with_priority(priority)))
                .unwrap();
            fx.clock.advance(Duration::seconds(1));
        }

        let queue = fx.engine.queue();
        let before: Vec<_> = queue.waiting(None).unwrap();
        let first = queue.reorder_by_priority(None).unwrap();
        let ranks: Vec<u32> = first.iter().map(|p| p.position).collect();
        assert_eq!(ranks, vec![1, 2, 3]);

        let waiting = queue.waiting(None).unwrap();
        let priorities: Vec<u8> = waiting.iter().map(|e| e.priority.value()).collect();
        assert_eq!(priorities, vec![2, 3, 5]);
        for (b, a) in before.iter().zip(&waiting) {
            assert_eq!(b.priority, a.priority);
        }

        let second = queue.reorder_by_priority(None).unwrap();
        assert_eq!(first, second);
        assert_eq!(queue.waiting(None).unwrap(), waiting);
    }

    #[test]
    fn test_enqueue_after_call_next_joins_at_the_back() {
        let fx = fixture();
        for patient in 1..=3 {
            admit(&fx, patient, None);
            fx.clock.advance(Duration::seconds(1));
        }
        fx.engine.queue().call_next(NURSE, None).unwrap().unwrap();
        let newcomer = admit(&fx, 4, None);

        let positions: Vec<u32> = fx
            .engine
            .queue()
            .waiting(None)
            .unwrap()
            .iter()
            .map(|e| e.position)
            .collect();
        let unique: HashSet<u32> = positions.iter().copied().collect();
        assert_eq!(unique.len(), positions.len(), "positions {positions:?}");
        assert_eq!(newcomer.position, 4);
    }

    #[test]
    fn test_reorder_ranks_each_department_separately() {
        let fx = fixture();
        admit(&fx, 1, Some(DepartmentId(1)));
        admit(&fx, 2, Some(DepartmentId(2)));
        admit(&fx, 3, Some(DepartmentId(2)));

        let positions = fx.engine.queue().reorder_by_priority(None).unwrap();
        let dept_two: Vec<u32> = positions
            .iter()
            .filter(|p| p.department == Some(DepartmentId(2)))
            .map(|p| p.position)
            .collect();
        assert_eq!(dept_two, vec![1, 2]);
        assert!(positions
            .iter()
            .any(|p| p.department == Some(DepartmentId(1)) && p.position == 1));
    }

    #[test]
    fn test_stats_counts() {
        let fx = fixture();
        let start = fx.clock.now();
        let first = admit(&fx, 1, None);
        fx.clock.advance(Duration::seconds(1));
        admit(&fx, 2, None);
        fx.engine
            .assessments()
            .create(NURSE, intake(3, sample_vitals()))
            .unwrap();

        let queue = fx.engine.queue();
        fx.clock.set(start + Duration::minutes(10));
        queue.call_next(NURSE, None).unwrap();
        queue.complete(NURSE, first.id).unwrap();
        fx.clock.advance(Duration::minutes(25));

        let stats = queue.stats(None).unwrap();
        assert_eq!(stats.waiting, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.completed_today, 1);
        assert_eq!(stats.by_level.get(&3), Some(&1));
        assert_eq!(stats.by_level.get(&5), Some(&1));
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.average_wait_minutes, Some(10.0));
    }

    #[test]
    fn test_concurrent_call_next_never_duplicates() {
        let fx = fixture();
        for patient in 1..=20 {
            admit(&fx, patient, Some(DepartmentId(patient % 2)));
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let queue = fx.engine.queue();
                let department = if i % 3 == 0 { None } else { Some(DepartmentId(i % 2)) };
                thread::spawn(move || {
                    let mut called = Vec::new();
                    while let Some(entry) = queue.call_next(NURSE, department).unwrap() {
                        called.push(entry.id);
                    }
                    called
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "entry {id} called twice");
                total += 1;
            }
        }
        assert_eq!(total, 20);
    }
}
