//! Boundaries to the systems around the engine.
//!
//! The engine never reaches for ambient state: the caller's identity is passed into every
//! operation, and everything else it needs from the outside world comes through these traits.
//! The implementations here are the ones the binaries and tests wire in; real deployments are
//! expected to supply their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError, RwLock};
use triage_types::{PatientId, UserId};

/// Identity/authorisation boundary.
pub trait Authorizer: Send + Sync {
    /// True if `user` holds a triage-capable role.
    fn is_authorized_for_triage(&self, user: UserId) -> bool;
}

/// Patient directory boundary.
pub trait PatientDirectory: Send + Sync {
    fn patient_exists(&self, patient: PatientId) -> bool;
}

/// Notification boundary. Delivery is fire-and-forget from the engine's point of view.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A level 1 or 2 patient has just been triaged.
    CriticalArrival,
    /// A reassessment moved a patient to level 1 or 2.
    Deterioration,
    /// Waiting patients have passed their reassessment deadline.
    SlaBreach,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub recipients: Vec<UserId>,
}

/// Authorises a fixed set of users.
#[derive(Debug, Default)]
pub struct StaticAuthorizer {
    users: HashSet<UserId>,
}

impl StaticAuthorizer {
    pub fn new(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_authorized_for_triage(&self, user: UserId) -> bool {
        self.users.contains(&user)
    }
}

/// Patient directory backed by an in-process set of known patients.
#[derive(Debug, Default)]
pub struct StaticPatientDirectory {
    patients: RwLock<HashSet<PatientId>>,
}

impl StaticPatientDirectory {
    pub fn new(patients: impl IntoIterator<Item = PatientId>) -> Self {
        Self {
            patients: RwLock::new(patients.into_iter().collect()),
        }
    }

    pub fn register(&self, patient: PatientId) {
        self.patients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(patient);
    }
}

impl PatientDirectory for StaticPatientDirectory {
    fn patient_exists(&self, patient: PatientId) -> bool {
        self.patients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&patient)
    }
}

/// Directory that treats every patient id as known.
///
/// Used by the development binaries, where patient registration belongs to the surrounding
/// clinic application.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllPatients;

impl PatientDirectory for AcceptAllPatients {
    fn patient_exists(&self, _patient: PatientId) -> bool {
        true
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send(&self, notification: Notification) {
        tracing::info!(
            kind = ?notification.kind,
            recipients = ?notification.recipients,
            "notification: {}",
            notification.message
        );
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
