//! In-process reference store.
//!
//! All tables live behind one `RwLock`. A commit validates the whole change set against the
//! current tables before touching anything, then applies it under the same write guard, so
//! readers never observe half of an operation.

use super::{
    AssessmentFilter, AssessmentRepository, ChangeSet, ProtocolRepository, QueueFilter,
    QueueRepository, ReassessmentRepository, StoreError, StoreResult, UnitOfWork,
    VitalSignsRepository,
};
use crate::assessment::{ReassessmentRecord, TriageAssessment};
use crate::protocol::TriageProtocol;
use crate::queue::TriageQueueEntry;
use crate::vitals::VitalSignsSnapshot;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use triage_types::{AssessmentId, ProtocolId, QueueEntryId};

#[derive(Debug, Default)]
struct Tables {
    assessments: HashMap<AssessmentId, TriageAssessment>,
    vital_signs: Vec<VitalSignsSnapshot>,
    reassessments: Vec<ReassessmentRecord>,
    queue_entries: HashMap<QueueEntryId, TriageQueueEntry>,
    protocols: HashMap<ProtocolId, TriageProtocol>,
}

/// Thread-safe in-memory implementation of every repository trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

fn assessment_visible(tables: &Tables, id: AssessmentId) -> bool {
    tables
        .assessments
        .get(&id)
        .is_some_and(|a| !a.is_deleted)
}

fn sorted_entries<'a>(
    entries: impl Iterator<Item = &'a TriageQueueEntry>,
) -> Vec<TriageQueueEntry> {
    let mut entries: Vec<_> = entries.cloned().collect();
    entries.sort_by(|a, b| a.queued_at.cmp(&b.queued_at).then(a.id.cmp(&b.id)));
    entries
}

impl AssessmentRepository for MemoryStore {
    fn find_assessment(&self, id: AssessmentId) -> StoreResult<Option<TriageAssessment>> {
        let tables = self.read()?;
        Ok(tables
            .assessments
            .get(&id)
            .filter(|a| !a.is_deleted)
            .cloned())
    }

    fn list_assessments(&self, filter: &AssessmentFilter) -> StoreResult<Vec<TriageAssessment>> {
        let tables = self.read()?;
        let mut found: Vec<_> = tables
            .assessments
            .values()
            .filter(|a| !a.is_deleted && filter.matches(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.arrived_at.cmp(&b.arrived_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

impl VitalSignsRepository for MemoryStore {
    fn vital_signs_for(&self, assessment: AssessmentId) -> StoreResult<Vec<VitalSignsSnapshot>> {
        let tables = self.read()?;
        if !assessment_visible(&tables, assessment) {
            return Ok(Vec::new());
        }
        let mut found: Vec<_> = tables
            .vital_signs
            .iter()
            .filter(|s| s.assessment_id == assessment)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        found.sort_by_key(|s| s.measured_at);
        Ok(found)
    }
}

impl ReassessmentRepository for MemoryStore {
    fn reassessments_for(
        &self,
        assessment: AssessmentId,
    ) -> StoreResult<Vec<ReassessmentRecord>> {
        let tables = self.read()?;
        if !assessment_visible(&tables, assessment) {
            return Ok(Vec::new());
        }
        let mut found: Vec<_> = tables
            .reassessments
            .iter()
            .filter(|r| r.assessment_id == assessment)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    fn reassessments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ReassessmentRecord>> {
        let tables = self.read()?;
        let mut found: Vec<_> = tables
            .reassessments
            .iter()
            .filter(|r| r.created_at >= from && r.created_at < to)
            .filter(|r| assessment_visible(&tables, r.assessment_id))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}

impl QueueRepository for MemoryStore {
    fn find_queue_entry(&self, id: QueueEntryId) -> StoreResult<Option<TriageQueueEntry>> {
        let tables = self.read()?;
        Ok(tables
            .queue_entries
            .get(&id)
            .filter(|e| assessment_visible(&tables, e.assessment_id))
            .cloned())
    }

    fn active_entry_for(
        &self,
        assessment: AssessmentId,
    ) -> StoreResult<Option<TriageQueueEntry>> {
        let tables = self.read()?;
        if !assessment_visible(&tables, assessment) {
            return Ok(None);
        }
        Ok(tables
            .queue_entries
            .values()
            .find(|e| e.assessment_id == assessment && e.is_active())
            .cloned())
    }

    fn entries_for(&self, assessment: AssessmentId) -> StoreResult<Vec<TriageQueueEntry>> {
        let tables = self.read()?;
        if !assessment_visible(&tables, assessment) {
            return Ok(Vec::new());
        }
        Ok(sorted_entries(
            tables
                .queue_entries
                .values()
                .filter(|e| e.assessment_id == assessment),
        ))
    }

    fn list_queue_entries(&self, filter: &QueueFilter) -> StoreResult<Vec<TriageQueueEntry>> {
        let tables = self.read()?;
        Ok(sorted_entries(tables.queue_entries.values().filter(|e| {
            filter.matches(e) && assessment_visible(&tables, e.assessment_id)
        })))
    }
}

impl ProtocolRepository for MemoryStore {
    fn find_protocol(&self, id: ProtocolId) -> StoreResult<Option<TriageProtocol>> {
        let tables = self.read()?;
        Ok(tables
            .protocols
            .get(&id)
            .filter(|p| !p.is_deleted)
            .cloned())
    }

    fn list_protocols(&self) -> StoreResult<Vec<TriageProtocol>> {
        let tables = self.read()?;
        let mut found: Vec<_> = tables
            .protocols
            .values()
            .filter(|p| !p.is_deleted)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

fn validate(tables: &Tables, changes: &ChangeSet) -> StoreResult<()> {
    let staged_assessments: HashSet<AssessmentId> =
        changes.assessments.iter().map(|a| a.id).collect();
    let known = |id: AssessmentId| {
        staged_assessments.contains(&id) || tables.assessments.contains_key(&id)
    };

    let mut snapshot_ids = HashSet::new();
    for snapshot in &changes.vital_signs {
        if !snapshot_ids.insert(snapshot.id)
            || tables.vital_signs.iter().any(|s| s.id == snapshot.id)
        {
            return Err(StoreError::Conflict(format!(
                "vital signs snapshot {} already recorded",
                snapshot.id
            )));
        }
        if !known(snapshot.assessment_id) {
            return Err(StoreError::Conflict(format!(
                "vital signs snapshot {} references unknown assessment {}",
                snapshot.id, snapshot.assessment_id
            )));
        }
    }

    let mut record_ids = HashSet::new();
    for record in &changes.reassessments {
        if !record_ids.insert(record.id) || tables.reassessments.iter().any(|r| r.id == record.id)
        {
            return Err(StoreError::Conflict(format!(
                "reassessment record {} already recorded",
                record.id
            )));
        }
        if !known(record.assessment_id) {
            return Err(StoreError::Conflict(format!(
                "reassessment record {} references unknown assessment {}",
                record.id, record.assessment_id
            )));
        }
    }

    let mut staged_entries: HashMap<QueueEntryId, &TriageQueueEntry> = HashMap::new();
    for entry in &changes.queue_entries {
        if !known(entry.assessment_id) {
            return Err(StoreError::Conflict(format!(
                "queue entry {} references unknown assessment {}",
                entry.id, entry.assessment_id
            )));
        }
        if let Some(existing) = tables.queue_entries.get(&entry.id) {
            if existing.assessment_id != entry.assessment_id {
                return Err(StoreError::Conflict(format!(
                    "queue entry {} cannot move to another assessment",
                    entry.id
                )));
            }
        }
        staged_entries.insert(entry.id, entry);
    }

    // At most one non-terminal entry per assessment once the change set is applied.
    let touched: HashSet<AssessmentId> = changes
        .queue_entries
        .iter()
        .map(|e| e.assessment_id)
        .collect();
    for assessment in touched {
        let persisted = tables
            .queue_entries
            .values()
            .filter(|e| e.assessment_id == assessment && !staged_entries.contains_key(&e.id));
        let staged = staged_entries
            .values()
            .copied()
            .filter(|e| e.assessment_id == assessment);
        let active = persisted.chain(staged).filter(|e| e.is_active()).count();
        if active > 1 {
            return Err(StoreError::Conflict(format!(
                "assessment {assessment} would have {active} active queue entries"
            )));
        }
    }

    Ok(())
}

impl UnitOfWork for MemoryStore {
    fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.write()?;
        validate(&tables, &changes)?;

        let ChangeSet {
            assessments,
            vital_signs,
            reassessments,
            queue_entries,
            protocols,
        } = changes;

        for assessment in assessments {
            tables.assessments.insert(assessment.id, assessment);
        }
        tables.vital_signs.extend(vital_signs);
        tables.reassessments.extend(reassessments);
        for entry in queue_entries {
            tables.queue_entries.insert(entry.id, entry);
        }
        for protocol in protocols {
            tables.protocols.insert(protocol.id, protocol);
        }

        tracing::debug!("change set committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueStatus;
    use crate::test_support::{sample_assessment, sample_entry, sample_vitals, t0};
    use crate::vitals::VitalSignsSnapshot;
    use triage_types::UserId;

    #[test]
    fn test_commit_is_visible_to_reads() {
        let store = MemoryStore::new();
        let assessment = sample_assessment();
        let entry = sample_entry(&assessment);
        let snapshot =
            VitalSignsSnapshot::new(assessment.id, t0(), UserId(1), sample_vitals());

        let mut changes = ChangeSet::new();
        changes
            .put_assessment(assessment.clone())
            .append_vital_signs(snapshot.clone())
            .put_queue_entry(entry.clone());
        store.commit(changes).unwrap();

        assert_eq!(
            store.find_assessment(assessment.id).unwrap().unwrap().id,
            assessment.id
        );
        assert_eq!(
            store.latest_vital_signs(assessment.id).unwrap().unwrap().id,
            snapshot.id
        );
        assert_eq!(
            store.active_entry_for(assessment.id).unwrap().unwrap().id,
            entry.id
        );
    }

    #[test]
    fn test_second_active_entry_rejects_whole_change_set() {
        let store = MemoryStore::new();
        let assessment = sample_assessment();
        let first = sample_entry(&assessment);
        let mut changes = ChangeSet::new();
        changes
            .put_assessment(assessment.clone())
            .put_queue_entry(first);
        store.commit(changes).unwrap();

        let snapshot =
            VitalSignsSnapshot::new(assessment.id, t0(), UserId(1), sample_vitals());
        let mut changes = ChangeSet::new();
        changes
            .append_vital_signs(snapshot)
            .put_queue_entry(sample_entry(&assessment));
        let err = store.commit(changes).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Nothing from the rejected change set was applied.
        assert!(store.vital_signs_for(assessment.id).unwrap().is_empty());
        assert_eq!(store.entries_for(assessment.id).unwrap().len(), 1);
    }

    #[test]
    fn test_closing_and_reopening_in_one_change_set_is_allowed() {
        let store = MemoryStore::new();
        let assessment = sample_assessment();
        let mut first = sample_entry(&assessment);
        let mut changes = ChangeSet::new();
        changes
            .put_assessment(assessment.clone())
            .put_queue_entry(first.clone());
        store.commit(changes).unwrap();

        first.status = QueueStatus::Completed;
        let mut changes = ChangeSet::new();
        changes
            .put_queue_entry(first)
            .put_queue_entry(sample_entry(&assessment));
        store.commit(changes).unwrap();
        assert_eq!(store.entries_for(assessment.id).unwrap().len(), 2);
    }

    #[test]
    fn test_append_only_rejects_duplicate_ids() {
        let store = MemoryStore::new();
        let assessment = sample_assessment();
        let snapshot =
            VitalSignsSnapshot::new(assessment.id, t0(), UserId(1), sample_vitals());
        let mut changes = ChangeSet::new();
        changes
            .put_assessment(assessment)
            .append_vital_signs(snapshot.clone());
        store.commit(changes).unwrap();

        let mut changes = ChangeSet::new();
        changes.append_vital_signs(snapshot);
        assert!(store.commit(changes).is_err());
    }

    #[test]
    fn test_orphan_rows_are_rejected() {
        let store = MemoryStore::new();
        let orphan = sample_assessment();
        let mut changes = ChangeSet::new();
        changes.put_queue_entry(sample_entry(&orphan));
        assert!(store.commit(changes).is_err());
    }

    #[test]
    fn test_soft_deleted_assessment_is_hidden() {
        let store = MemoryStore::new();
        let mut assessment = sample_assessment();
        let entry = sample_entry(&assessment);
        let mut changes = ChangeSet::new();
        changes
            .put_assessment(assessment.clone())
            .put_queue_entry(entry.clone());
        store.commit(changes).unwrap();

        assessment.is_deleted = true;
        let mut changes = ChangeSet::new();
        changes.put_assessment(assessment.clone());
        store.commit(changes).unwrap();

        assert!(store.find_assessment(assessment.id).unwrap().is_none());
        assert!(store.find_queue_entry(entry.id).unwrap().is_none());
        assert!(store
            .list_queue_entries(&QueueFilter::default())
            .unwrap()
            .is_empty());
    }
}
