//! Acuity levels, dispatch priority and reassessment SLAs.
//!
//! The acuity scale is a five-point ordinal (1 = most severe), in the style of the Emergency
//! Severity Index. Priority is derived from the level and the latest vital signs; lower values
//! are dispatched sooner and the value never drops below [`Priority::HIGHEST`].

use crate::constants::{
    DEFAULT_SLA_LEVEL_2_MINUTES, DEFAULT_SLA_LEVEL_3_MINUTES, DEFAULT_SLA_LEVEL_4_MINUTES,
    DEFAULT_SLA_LEVEL_5_MINUTES,
};
use crate::error::{TriageError, TriageResult};
use crate::vitals::VitalSigns;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Five-point acuity scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AcuityLevel {
    /// Level 1: immediate life-saving intervention.
    Resuscitation = 1,
    /// Level 2: high risk, should not wait.
    Emergent = 2,
    /// Level 3: stable but needs several resources.
    Urgent = 3,
    /// Level 4: one resource expected.
    LessUrgent = 4,
    /// Level 5: no resources expected.
    NonUrgent = 5,
}

impl AcuityLevel {
    pub const ALL: [AcuityLevel; 5] = [
        AcuityLevel::Resuscitation,
        AcuityLevel::Emergent,
        AcuityLevel::Urgent,
        AcuityLevel::LessUrgent,
        AcuityLevel::NonUrgent,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(value: u8) -> TriageResult<Self> {
        match value {
            1 => Ok(AcuityLevel::Resuscitation),
            2 => Ok(AcuityLevel::Emergent),
            3 => Ok(AcuityLevel::Urgent),
            4 => Ok(AcuityLevel::LessUrgent),
            5 => Ok(AcuityLevel::NonUrgent),
            other => Err(TriageError::InvalidInput(format!(
                "acuity level must be between 1 and 5, got {other}"
            ))),
        }
    }

    /// Level 1 patients are never put on an SLA timer; they are always seen first.
    pub fn requires_immediate_care(self) -> bool {
        self == AcuityLevel::Resuscitation
    }

    /// True when `self` is strictly more severe than `other`.
    pub fn is_more_severe_than(self, other: AcuityLevel) -> bool {
        self.number() < other.number()
    }
}

impl fmt::Display for AcuityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for AcuityLevel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| TriageError::InvalidInput(format!("invalid acuity level: '{s}'")))?;
        Self::from_number(value)
    }
}

impl Serialize for AcuityLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for AcuityLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        AcuityLevel::from_number(value).map_err(serde::de::Error::custom)
    }
}

/// Dispatch priority; lower is more urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(1);

    /// Creates a priority, rejecting zero.
    pub fn new(value: u8) -> TriageResult<Self> {
        if value == 0 {
            return Err(TriageError::InvalidInput(
                "priority must be at least 1".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// One step more urgent, never below [`Priority::HIGHEST`].
    fn escalate(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::HIGHEST.0))
    }
}

impl From<AcuityLevel> for Priority {
    fn from(level: AcuityLevel) -> Self {
        Priority(level.number())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Priority::new(value).map_err(serde::de::Error::custom)
    }
}

fn below(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v < threshold)
}

fn above(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

fn outside(value: Option<f64>, low: f64, high: f64) -> bool {
    below(value, low) || above(value, high)
}

/// Derives an acuity level from vital signs alone.
///
/// Rules are evaluated from most to least severe and the first match wins, so a patient with
/// both level 1 and level 3 indicators is level 1. With no matching rule the patient is level 5.
pub fn compute_level(vitals: &VitalSigns) -> AcuityLevel {
    let spo2 = vitals.oxygen_saturation.map(f64::from);
    let gcs = vitals.consciousness.map(f64::from);
    let sbp = vitals.systolic_bp.map(f64::from);
    let hr = vitals.heart_rate.map(f64::from);
    let temp = vitals.temperature;

    if below(spo2, 90.0) || below(gcs, 8.0) {
        AcuityLevel::Resuscitation
    } else if below(sbp, 90.0) || above(hr, 120.0) || above(temp, 39.0) {
        AcuityLevel::Emergent
    } else if below(sbp, 100.0) || above(hr, 100.0) || above(temp, 38.0) {
        AcuityLevel::Urgent
    } else {
        AcuityLevel::NonUrgent
    }
}

/// Computes dispatch priority from a level and the latest vital signs.
///
/// Starts at the level's number and escalates one step for desaturation or an extreme heart
/// rate, and one further step for hypotension or an extreme temperature.
pub fn compute_priority(level: AcuityLevel, vitals: Option<&VitalSigns>) -> Priority {
    let mut priority = Priority::from(level);
    let Some(vitals) = vitals else {
        return priority;
    };

    let spo2 = vitals.oxygen_saturation.map(f64::from);
    let hr = vitals.heart_rate.map(f64::from);
    let sbp = vitals.systolic_bp.map(f64::from);
    let temp = vitals.temperature;

    if below(spo2, 90.0) || outside(hr, 50.0, 120.0) {
        priority = priority.escalate();
    }
    if below(sbp, 90.0) || outside(temp, 35.0, 39.0) {
        priority = priority.escalate();
    }

    priority
}

/// Minutes allowed between reassessments for each timed acuity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub level_2_minutes: i64,
    pub level_3_minutes: i64,
    pub level_4_minutes: i64,
    pub level_5_minutes: i64,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            level_2_minutes: DEFAULT_SLA_LEVEL_2_MINUTES,
            level_3_minutes: DEFAULT_SLA_LEVEL_3_MINUTES,
            level_4_minutes: DEFAULT_SLA_LEVEL_4_MINUTES,
            level_5_minutes: DEFAULT_SLA_LEVEL_5_MINUTES,
        }
    }
}

impl SlaPolicy {
    /// Builds a policy, requiring positive minutes that do not shrink as severity decreases.
    pub fn new(minutes: [i64; 4]) -> TriageResult<Self> {
        if minutes.iter().any(|m| *m <= 0) {
            return Err(TriageError::InvalidInput(
                "SLA minutes must be positive".into(),
            ));
        }
        if minutes.windows(2).any(|w| w[0] > w[1]) {
            return Err(TriageError::InvalidInput(
                "SLA minutes must not decrease for less severe levels".into(),
            ));
        }
        Ok(Self {
            level_2_minutes: minutes[0],
            level_3_minutes: minutes[1],
            level_4_minutes: minutes[2],
            level_5_minutes: minutes[3],
        })
    }

    /// Reassessment interval for `level`; `None` for level 1, which is not timer based.
    pub fn interval(&self, level: AcuityLevel) -> Option<Duration> {
        let minutes = match level {
            AcuityLevel::Resuscitation => return None,
            AcuityLevel::Emergent => self.level_2_minutes,
            AcuityLevel::Urgent => self.level_3_minutes,
            AcuityLevel::LessUrgent => self.level_4_minutes,
            AcuityLevel::NonUrgent => self.level_5_minutes,
        };
        Some(Duration::minutes(minutes))
    }

    /// Deadline for the next reassessment of a patient at `level`, counted from `from`.
    pub fn due_at(&self, level: AcuityLevel, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.interval(level).map(|interval| from + interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn level_four_profile() -> VitalSigns {
        VitalSigns {
            systolic_bp: Some(125),
            diastolic_bp: Some(82),
            heart_rate: Some(88),
            respiratory_rate: Some(16),
            temperature: Some(37.0),
            oxygen_saturation: Some(97),
            consciousness: Some(15),
        }
    }

    #[test]
    fn test_compute_level_defaults_to_non_urgent() {
        assert_eq!(compute_level(&level_four_profile()), AcuityLevel::NonUrgent);
        assert_eq!(compute_level(&VitalSigns::default()), AcuityLevel::NonUrgent);
    }

    #[test]
    fn test_compute_level_rules() {
        let hypoxic = VitalSigns {
            oxygen_saturation: Some(89),
            ..level_four_profile()
        };
        assert_eq!(compute_level(&hypoxic), AcuityLevel::Resuscitation);

        let obtunded = VitalSigns {
            consciousness: Some(7),
            ..level_four_profile()
        };
        assert_eq!(compute_level(&obtunded), AcuityLevel::Resuscitation);

        let tachycardic = VitalSigns {
            heart_rate: Some(121),
            ..level_four_profile()
        };
        assert_eq!(compute_level(&tachycardic), AcuityLevel::Emergent);

        let febrile = VitalSigns {
            temperature: Some(38.5),
            ..level_four_profile()
        };
        assert_eq!(compute_level(&febrile), AcuityLevel::Urgent);

        let soft_pressure = VitalSigns {
            systolic_bp: Some(95),
            diastolic_bp: Some(60),
            ..level_four_profile()
        };
        assert_eq!(compute_level(&soft_pressure), AcuityLevel::Urgent);
    }

    #[test]
    fn test_most_severe_rule_wins() {
        let mixed = VitalSigns {
            heart_rate: Some(110),
            temperature: Some(38.4),
            oxygen_saturation: Some(85),
            ..level_four_profile()
        };
        assert_eq!(compute_level(&mixed), AcuityLevel::Resuscitation);
    }

    #[test]
    fn test_adding_level_one_value_always_escalates_to_level_one() {
        for spo2 in [0u8, 50, 80, 89] {
            let vitals = VitalSigns {
                oxygen_saturation: Some(spo2),
                ..level_four_profile()
            };
            assert_eq!(compute_level(&vitals), AcuityLevel::Resuscitation);
        }
    }

    #[test]
    fn test_priority_base_is_level() {
        for level in AcuityLevel::ALL {
            assert_eq!(
                compute_priority(level, Some(&level_four_profile())).value(),
                level.number()
            );
            assert_eq!(compute_priority(level, None).value(), level.number());
        }
    }

    #[test]
    fn test_priority_escalates_by_two_steps_at_most() {
        let vitals = VitalSigns {
            oxygen_saturation: Some(85),
            heart_rate: Some(130),
            systolic_bp: Some(80),
            diastolic_bp: Some(50),
            temperature: Some(40.0),
            ..level_four_profile()
        };
        assert_eq!(compute_priority(AcuityLevel::NonUrgent, Some(&vitals)).value(), 3);
        assert_eq!(compute_priority(AcuityLevel::Urgent, Some(&vitals)).value(), 1);
    }

    #[test]
    fn test_priority_never_below_one() {
        let vitals = VitalSigns {
            oxygen_saturation: Some(70),
            systolic_bp: Some(70),
            diastolic_bp: Some(40),
            ..level_four_profile()
        };
        for level in AcuityLevel::ALL {
            assert!(compute_priority(level, Some(&vitals)) >= Priority::HIGHEST);
        }
    }

    #[test]
    fn test_bradycardia_escalates_priority() {
        let vitals = VitalSigns {
            heart_rate: Some(45),
            ..level_four_profile()
        };
        assert_eq!(compute_priority(AcuityLevel::LessUrgent, Some(&vitals)).value(), 3);
    }

    #[test]
    fn test_sla_intervals() {
        let policy = SlaPolicy::default();
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(policy.due_at(AcuityLevel::Resuscitation, t), None);
        assert_eq!(
            policy.due_at(AcuityLevel::Emergent, t),
            Some(t + Duration::minutes(15))
        );
        assert_eq!(
            policy.due_at(AcuityLevel::Urgent, t),
            Some(t + Duration::minutes(30))
        );
        assert_eq!(
            policy.due_at(AcuityLevel::LessUrgent, t),
            Some(t + Duration::minutes(60))
        );
        assert_eq!(
            policy.due_at(AcuityLevel::NonUrgent, t),
            Some(t + Duration::minutes(120))
        );
    }

    #[test]
    fn test_sla_policy_rejects_bad_minutes() {
        assert!(SlaPolicy::new([0, 30, 60, 120]).is_err());
        assert!(SlaPolicy::new([30, 15, 60, 120]).is_err());
        assert!(SlaPolicy::new([10, 20, 40, 80]).is_ok());
    }

    #[test]
    fn test_level_serialises_as_number() {
        assert_eq!(serde_json::to_string(&AcuityLevel::Urgent).unwrap(), "3");
        let level: AcuityLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, AcuityLevel::Emergent);
        assert!(serde_json::from_str::<AcuityLevel>("6").is_err());
        assert!(serde_json::from_str::<Priority>("0").is_err());
    }
}
