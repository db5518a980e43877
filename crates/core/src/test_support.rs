//! Shared fixtures for unit tests.

use crate::acuity::{compute_level, compute_priority, SlaPolicy};
use crate::assessment::{AssessmentStatus, NewAssessment, TriageAssessment};
use crate::collaborators::{ManualClock, RecordingNotifier, StaticAuthorizer, StaticPatientDirectory};
use crate::config::TriageConfig;
use crate::engine::{Collaborators, TriageEngine};
use crate::queue::{EnqueueRequest, TriageQueueEntry};
use crate::store::MemoryStore;
use crate::vitals::VitalSigns;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use triage_types::{AssessmentId, NonEmptyText, PatientId, UserId};

pub(crate) const NURSE: UserId = UserId(10);
pub(crate) const OUTSIDER: UserId = UserId(99);
pub(crate) const CHARGE_NURSE: UserId = UserId(100);

/// Monday morning, far enough from midnight for day-based assertions.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

pub(crate) struct Fixture {
    pub(crate) engine: TriageEngine,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) notifier: Arc<RecordingNotifier>,
}

pub(crate) fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::new(t0()));
    let notifier = Arc::new(RecordingNotifier::default());
    let patients = StaticPatientDirectory::new((1..=50).map(PatientId));
    let cfg = TriageConfig::new(
        SlaPolicy::default(),
        vec![CHARGE_NURSE],
        None,
        Duration::from_secs(60),
    )
    .unwrap();

    let engine = TriageEngine::new(
        Arc::new(cfg),
        Arc::new(MemoryStore::new()),
        Collaborators {
            authorizer: Arc::new(StaticAuthorizer::new([NURSE, CHARGE_NURSE])),
            patients: Arc::new(patients),
            notifier: notifier.clone(),
            clock: clock.clone(),
        },
    );

    Fixture {
        engine,
        clock,
        notifier,
    }
}

/// Normal adult readings: level 5, priority 5.
pub(crate) fn sample_vitals() -> VitalSigns {
    VitalSigns {
        systolic_bp: Some(120),
        diastolic_bp: Some(80),
        heart_rate: Some(72),
        respiratory_rate: Some(14),
        temperature: Some(36.8),
        oxygen_saturation: Some(98),
        consciousness: Some(15),
    }
}

/// Tachycardic: level 3, priority 3.
pub(crate) fn urgent_vitals() -> VitalSigns {
    VitalSigns {
        heart_rate: Some(110),
        ..sample_vitals()
    }
}

/// SpO2 88 %, HR 70: critical, level 1, priority 1.
pub(crate) fn critical_vitals() -> VitalSigns {
    VitalSigns {
        oxygen_saturation: Some(88),
        heart_rate: Some(70),
        ..Default::default()
    }
}

/// Readings that produce the given priority at intake.
pub(crate) fn vitals_with_priority(priority: u8) -> VitalSigns {
    let vitals = match priority {
        1 => critical_vitals(),
        2 => VitalSigns {
            systolic_bp: Some(95),
            heart_rate: Some(45),
            ..sample_vitals()
        },
        3 => urgent_vitals(),
        4 => VitalSigns {
            heart_rate: Some(45),
            ..sample_vitals()
        },
        _ => sample_vitals(),
    };
    debug_assert_eq!(
        compute_priority(compute_level(&vitals), Some(&vitals)).value(),
        priority.clamp(1, 5)
    );
    vitals
}

pub(crate) fn intake(patient: u64, vitals: VitalSigns) -> NewAssessment {
    NewAssessment {
        patient_id: PatientId(patient),
        chief_complaint: "Shortness of breath".into(),
        vitals,
        notes: None,
        arrived_at: None,
        isolation: None,
        target_department: None,
        target_doctor: None,
    }
}

/// A pending assessment built without going through the engine.
pub(crate) fn sample_assessment() -> TriageAssessment {
    let vitals = sample_vitals();
    let level = compute_level(&vitals);
    TriageAssessment {
        id: AssessmentId::new(),
        patient_id: PatientId(1),
        assessor_id: NURSE,
        chief_complaint: NonEmptyText::new("Headache").unwrap(),
        level,
        priority: compute_priority(level, Some(&vitals)),
        notes: None,
        isolation: None,
        arrived_at: t0(),
        triage_started_at: t0(),
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
    }
}

pub(crate) fn sample_entry(assessment: &TriageAssessment) -> TriageQueueEntry {
    TriageQueueEntry::new(
        assessment,
        &EnqueueRequest::default(),
        1,
        NURSE,
        t0(),
        &SlaPolicy::default(),
    )
}
