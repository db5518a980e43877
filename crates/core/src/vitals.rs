//! Vital signs snapshots and their clinical evaluation.
//!
//! Evaluation is a pure function of a single snapshot: it needs no assessment context and has no
//! side effects. Any reading may be missing; rules that reference a missing reading do not fire.

use crate::acuity::{compute_level, AcuityLevel};
use crate::error::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use triage_types::{AssessmentId, UserId, VitalSignsId};

/// A physiological reading that rules and protocol criteria can refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalSign {
    SystolicBp,
    DiastolicBp,
    HeartRate,
    RespiratoryRate,
    Temperature,
    OxygenSaturation,
    Consciousness,
}

impl VitalSign {
    pub const ALL: [VitalSign; 7] = [
        VitalSign::SystolicBp,
        VitalSign::DiastolicBp,
        VitalSign::HeartRate,
        VitalSign::RespiratoryRate,
        VitalSign::Temperature,
        VitalSign::OxygenSaturation,
        VitalSign::Consciousness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VitalSign::SystolicBp => "systolic_bp",
            VitalSign::DiastolicBp => "diastolic_bp",
            VitalSign::HeartRate => "heart_rate",
            VitalSign::RespiratoryRate => "respiratory_rate",
            VitalSign::Temperature => "temperature",
            VitalSign::OxygenSaturation => "oxygen_saturation",
            VitalSign::Consciousness => "consciousness",
        }
    }

    /// Inclusive range of physiologically plausible values accepted on input.
    fn plausible_range(self) -> (f64, f64) {
        match self {
            VitalSign::SystolicBp => (40.0, 300.0),
            VitalSign::DiastolicBp => (20.0, 200.0),
            VitalSign::HeartRate => (20.0, 300.0),
            VitalSign::RespiratoryRate => (0.0, 80.0),
            VitalSign::Temperature => (25.0, 45.0),
            VitalSign::OxygenSaturation => (0.0, 100.0),
            VitalSign::Consciousness => (3.0, 15.0),
        }
    }
}

impl fmt::Display for VitalSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The readings taken at one point in time.
///
/// Pressures in mmHg, rates per minute, temperature in °C, oxygen saturation in percent and
/// consciousness as a Glasgow Coma Scale score (3–15).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VitalSigns {
    #[serde(default)]
    pub systolic_bp: Option<u16>,
    #[serde(default)]
    pub diastolic_bp: Option<u16>,
    #[serde(default)]
    pub heart_rate: Option<u16>,
    #[serde(default)]
    pub respiratory_rate: Option<u16>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub oxygen_saturation: Option<u8>,
    #[serde(default)]
    pub consciousness: Option<u8>,
}

impl VitalSigns {
    /// Returns the reading for `sign` as a float, if it was taken.
    pub fn reading(&self, sign: VitalSign) -> Option<f64> {
        match sign {
            VitalSign::SystolicBp => self.systolic_bp.map(f64::from),
            VitalSign::DiastolicBp => self.diastolic_bp.map(f64::from),
            VitalSign::HeartRate => self.heart_rate.map(f64::from),
            VitalSign::RespiratoryRate => self.respiratory_rate.map(f64::from),
            VitalSign::Temperature => self.temperature,
            VitalSign::OxygenSaturation => self.oxygen_saturation.map(f64::from),
            VitalSign::Consciousness => self.consciousness.map(f64::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        VitalSign::ALL.iter().all(|s| self.reading(*s).is_none())
    }

    /// Rejects snapshots that could not have come from a real measurement.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidVitalSigns`] if no reading is present, a reading is not a
    /// finite number, a reading is outside its plausible range, or diastolic pressure is not
    /// below systolic pressure.
    pub fn validate(&self) -> TriageResult<()> {
        if self.is_empty() {
            return Err(TriageError::InvalidVitalSigns(
                "at least one reading is required".into(),
            ));
        }

        for sign in VitalSign::ALL {
            let Some(value) = self.reading(sign) else {
                continue;
            };
            if !value.is_finite() {
                return Err(TriageError::InvalidVitalSigns(format!(
                    "{sign} must be a finite number"
                )));
            }
            let (min, max) = sign.plausible_range();
            if value < min || value > max {
                return Err(TriageError::InvalidVitalSigns(format!(
                    "{sign} {value} is outside the plausible range {min}..={max}"
                )));
            }
        }

        if let (Some(sys), Some(dia)) = (self.systolic_bp, self.diastolic_bp) {
            if dia >= sys {
                return Err(TriageError::InvalidVitalSigns(format!(
                    "diastolic_bp {dia} must be lower than systolic_bp {sys}"
                )));
            }
        }

        Ok(())
    }
}

/// A recorded, immutable vital-signs measurement belonging to one assessment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalSignsSnapshot {
    pub id: VitalSignsId,
    pub assessment_id: AssessmentId,
    pub measured_at: DateTime<Utc>,
    pub recorded_by: UserId,
    pub readings: VitalSigns,
}

impl VitalSignsSnapshot {
    pub fn new(
        assessment_id: AssessmentId,
        measured_at: DateTime<Utc>,
        recorded_by: UserId,
        readings: VitalSigns,
    ) -> Self {
        Self {
            id: VitalSignsId::new(),
            assessment_id,
            measured_at,
            recorded_by,
            readings,
        }
    }
}

/// Three-valued clinical status, ordered from least to most concerning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalStatus {
    Normal,
    Abnormal,
    Critical,
}

impl ClinicalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClinicalStatus::Normal => "normal",
            ClinicalStatus::Abnormal => "abnormal",
            ClinicalStatus::Critical => "critical",
        }
    }
}

/// One reading that pushed the status away from normal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub sign: VitalSign,
    pub value: f64,
    pub status: ClinicalStatus,
}

/// Result of evaluating a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: ClinicalStatus,
    pub findings: Vec<Finding>,
    pub suggested_level: AcuityLevel,
}

fn outside(value: f64, low: f64, high: f64) -> bool {
    value < low || value > high
}

fn abnormal_findings(vitals: &VitalSigns) -> Vec<Finding> {
    let checks: [(VitalSign, fn(f64) -> bool); 4] = [
        (VitalSign::SystolicBp, |v| outside(v, 90.0, 180.0)),
        (VitalSign::DiastolicBp, |v| outside(v, 60.0, 110.0)),
        (VitalSign::HeartRate, |v| outside(v, 60.0, 100.0)),
        (VitalSign::Temperature, |v| outside(v, 36.1, 37.2)),
    ];
    findings_for(vitals, &checks, ClinicalStatus::Abnormal)
}

fn critical_findings(vitals: &VitalSigns) -> Vec<Finding> {
    let checks: [(VitalSign, fn(f64) -> bool); 2] = [
        (VitalSign::OxygenSaturation, |v| v < 95.0),
        (VitalSign::Consciousness, |v| v < 15.0),
    ];
    findings_for(vitals, &checks, ClinicalStatus::Critical)
}

fn findings_for(
    vitals: &VitalSigns,
    checks: &[(VitalSign, fn(f64) -> bool)],
    status: ClinicalStatus,
) -> Vec<Finding> {
    checks
        .iter()
        .filter_map(|(sign, triggered)| {
            let value = vitals.reading(*sign)?;
            triggered(value).then_some(Finding {
                sign: *sign,
                value,
                status,
            })
        })
        .collect()
}

/// Classifies a snapshot as normal, abnormal or critical.
///
/// Abnormal conditions are checked first; any critical condition then overrides them.
pub fn clinical_status(vitals: &VitalSigns) -> ClinicalStatus {
    if !critical_findings(vitals).is_empty() {
        ClinicalStatus::Critical
    } else if !abnormal_findings(vitals).is_empty() {
        ClinicalStatus::Abnormal
    } else {
        ClinicalStatus::Normal
    }
}

/// Full evaluation: status, the readings responsible for it and the suggested acuity level.
pub fn evaluate(vitals: &VitalSigns) -> Evaluation {
    let mut findings = abnormal_findings(vitals);
    findings.extend(critical_findings(vitals));

    let status = findings
        .iter()
        .map(|f| f.status)
        .max()
        .unwrap_or(ClinicalStatus::Normal);

    Evaluation {
        status,
        findings,
        suggested_level: compute_level(vitals),
    }
}
