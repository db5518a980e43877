//! Serialisation of mutations.
//!
//! Assessment mutations are serialised per assessment id and queue mutations per department
//! partition. Operations spanning every department take the queue gate exclusively; every
//! department-scoped operation holds it shared. Lock order is always
//! assessment -> gate -> department. Catalog changes are serialised by a single lock that is
//! never held together with the others.
//!
//! The locks guard no data themselves (the store owns the data), so a poisoned lock is simply
//! recovered.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use triage_types::{AssessmentId, DepartmentId};

/// Registry entries are pruned once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1_024;

/// Lazily created mutex per key.
#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    fn lock_for(&self, key: K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() > PRUNE_THRESHOLD {
            // Only the registry holds a reference to idle locks.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks.entry(key).or_default().clone()
    }

    /// Runs `f` while holding the lock for `key`.
    pub(crate) fn with<T>(&self, key: K, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

/// Department partition key: a target department, or the unassigned partition (`None`).
pub(crate) type DepartmentKey = Option<DepartmentId>;

#[derive(Debug, Default)]
pub(crate) struct QueueLocks {
    gate: RwLock<()>,
    departments: KeyedLocks<DepartmentKey>,
}

impl QueueLocks {
    /// Runs `f` with exclusive access to one department partition.
    pub(crate) fn with_department<T>(&self, key: DepartmentKey, f: impl FnOnce() -> T) -> T {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        self.departments.with(key, f)
    }

    /// Runs `f` with exclusive access to every department partition.
    pub(crate) fn with_all_departments<T>(&self, f: impl FnOnce() -> T) -> T {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// `Some(department)` locks that department; `None` means every department.
    pub(crate) fn with_scope<T>(&self, scope: Option<DepartmentId>, f: impl FnOnce() -> T) -> T {
        match scope {
            Some(department) => self.with_department(Some(department), f),
            None => self.with_all_departments(f),
        }
    }
}

/// Lock registries owned by the engine.
#[derive(Debug, Default)]
pub(crate) struct EngineLocks {
    pub(crate) assessments: KeyedLocks<AssessmentId>,
    pub(crate) queue: QueueLocks,
    catalog: Mutex<()>,
}

impl EngineLocks {
    /// Runs `f` with exclusive access to the protocol catalog.
    pub(crate) fn with_catalog<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}
