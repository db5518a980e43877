//! Clinical triage protocols and decision assistance.
//!
//! A protocol is a named, versioned rule: when its criteria match the latest vital signs it
//! suggests a target acuity level and priority. Criteria are data (vital-sign comparisons
//! combined with `all` or `any`), so catalogs can be loaded from YAML without code changes.
//!
//! Responsibilities:
//! - Match protocols against an assessment's latest vital signs
//! - Apply a protocol's level and priority to an open assessment, with an audit record
//! - Manage the catalog: register, deactivate, soft delete, list and load from YAML
//!
//! Notes:
//! - Applying a protocol is the only path that sets priority without recomputing it
//! - A protocol with no criteria never matches

use crate::acuity::{AcuityLevel, Priority};
use crate::assessment::{
    is_critical_level, load_assessment, AppliedProtocol, ReassessmentReason, ReassessmentRecord,
    TriageAssessment,
};
use crate::collaborators::NotificationKind;
use crate::engine::EngineContext;
use crate::error::{TriageError, TriageResult};
use crate::queue::{commit_with_active_entry, EntryUpdate};
use crate::store::ChangeSet;
use crate::vitals::{VitalSign, VitalSigns};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use triage_types::{AssessmentId, NonEmptyText, ProtocolId, ReassessmentId, UserId};

// ============================================================================
// Public domain-level types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl ComparisonOperator {
    fn holds(self, reading: f64, value: f64) -> bool {
        match self {
            ComparisonOperator::Lt => reading < value,
            ComparisonOperator::Le => reading <= value,
            ComparisonOperator::Gt => reading > value,
            ComparisonOperator::Ge => reading >= value,
            ComparisonOperator::Eq => (reading - value).abs() < f64::EPSILON,
        }
    }
}

/// One vital-sign comparison, e.g. `oxygen_saturation lt 90`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Criterion {
    pub sign: VitalSign,
    pub operator: ComparisonOperator,
    pub value: f64,
}

impl Criterion {
    /// A missing reading never satisfies a criterion.
    pub fn matches(&self, vitals: &VitalSigns) -> bool {
        vitals
            .reading(self.sign)
            .is_some_and(|reading| self.operator.holds(reading, self.value))
    }
}

/// How a protocol's criteria are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageProtocol {
    pub id: ProtocolId,
    pub name: NonEmptyText,
    pub version: NonEmptyText,
    pub description: Option<String>,
    pub level: AcuityLevel,
    pub priority: Priority,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub criteria: Vec<Criterion>,
    pub match_mode: MatchMode,
    pub required_actions: Vec<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl TriageProtocol {
    /// True when `at` lies in `[valid_from, valid_to)`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_to.map_or(true, |to| at < to)
    }

    pub fn is_applicable_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && !self.is_deleted && self.is_valid_at(at)
    }

    pub fn matches(&self, vitals: &VitalSigns) -> bool {
        if self.criteria.is_empty() {
            return false;
        }
        match self.match_mode {
            MatchMode::All => self.criteria.iter().all(|c| c.matches(vitals)),
            MatchMode::Any => self.criteria.iter().any(|c| c.matches(vitals)),
        }
    }
}

/// Input for [`ProtocolService::register`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewProtocol {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub level: AcuityLevel,
    /// Defaults to the level's number.
    pub priority: Option<Priority>,
    /// Defaults to the time of registration.
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub criteria: Vec<Criterion>,
    pub match_mode: MatchMode,
    pub required_actions: Vec<String>,
    pub active: bool,
}

/// Result of [`ProtocolService::apply`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolApplication {
    pub assessment: TriageAssessment,
    pub record: ReassessmentRecord,
}

fn build_protocol(new: NewProtocol, now: DateTime<Utc>) -> TriageResult<TriageProtocol> {
    let name = NonEmptyText::new(&new.name)?;
    let version = NonEmptyText::new(&new.version)?;
    let valid_from = new.valid_from.unwrap_or(now);

    if let Some(valid_to) = new.valid_to {
        if valid_to <= valid_from {
            return Err(TriageError::InvalidInput(format!(
                "protocol '{name}' validity window ends before it starts"
            )));
        }
    }

    if let Some(bad) = new.criteria.iter().find(|c| !c.value.is_finite()) {
        return Err(TriageError::InvalidInput(format!(
            "protocol '{name}' criterion on {} has a non-numeric value",
            bad.sign
        )));
    }

    let required_actions = new
        .required_actions
        .into_iter()
        .map(|a| a.trim().to_owned())
        .filter(|a| !a.is_empty())
        .collect();

    Ok(TriageProtocol {
        id: ProtocolId::new(),
        name,
        version,
        description: new
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty()),
        level: new.level,
        priority: new.priority.unwrap_or_else(|| Priority::from(new.level)),
        valid_from,
        valid_to: new.valid_to,
        criteria: new.criteria,
        match_mode: new.match_mode,
        required_actions,
        is_active: new.active,
        is_deleted: false,
        created_at: now,
    })
}

// ============================================================================
// Catalog parsing
// ============================================================================

/// Parse a YAML protocol catalog.
///
/// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `protocols[0].criteria`)
/// to the failing field when the YAML does not match the catalog schema.
///
/// # Errors
///
/// Returns [`TriageError::CatalogSchema`] if:
/// - the YAML is not a mapping with a `protocols` list,
/// - any field has an unexpected type or value,
/// - any unknown keys are present (due to `#[serde(deny_unknown_fields)]`).
pub fn parse_catalog(yaml_text: &str) -> TriageResult<Vec<NewProtocol>> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    let wire = match serde_path_to_error::deserialize::<_, CatalogWire>(deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() {
                "<root>".to_owned()
            } else {
                path
            };
            return Err(TriageError::CatalogSchema {
                path,
                message: source.to_string(),
            });
        }
    };

    Ok(wire.protocols.into_iter().map(wire_to_new).collect())
}

/// Read and parse a YAML protocol catalog file.
pub fn read_catalog_file(path: &Path) -> TriageResult<Vec<NewProtocol>> {
    let text = std::fs::read_to_string(path).map_err(TriageError::FileRead)?;
    parse_catalog(&text)
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogWire {
    protocols: Vec<ProtocolWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProtocolWire {
    name: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    level: AcuityLevel,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    valid_to: Option<DateTime<Utc>>,
    #[serde(default, rename = "match")]
    match_mode: MatchMode,
    #[serde(default)]
    criteria: Vec<Criterion>,
    #[serde(default)]
    required_actions: Vec<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

fn wire_to_new(wire: ProtocolWire) -> NewProtocol {
    NewProtocol {
        name: wire.name,
        version: wire.version,
        description: wire.description,
        level: wire.level,
        priority: wire.priority,
        valid_from: wire.valid_from,
        valid_to: wire.valid_to,
        criteria: wire.criteria,
        match_mode: wire.match_mode,
        required_actions: wire.required_actions,
        active: wire.active,
    }
}

// ============================================================================
// Service
// ============================================================================

fn load_protocol(ctx: &EngineContext, id: ProtocolId) -> TriageResult<TriageProtocol> {
    ctx.store
        .find_protocol(id)?
        .ok_or(TriageError::ProtocolNotFound(id))
}

/// Protocol matching, application and catalog management.
#[derive(Clone)]
pub struct ProtocolService {
    ctx: Arc<EngineContext>,
}

impl ProtocolService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Active, currently valid protocols matching the assessment's latest vital signs.
    ///
    /// Ordered by protocol priority, then name. Empty when no vital signs were recorded.
    pub fn suggest(&self, assessment_id: AssessmentId) -> TriageResult<Vec<TriageProtocol>> {
        let ctx = &self.ctx;
        load_assessment(ctx, assessment_id)?;
        let Some(latest) = ctx.store.latest_vital_signs(assessment_id)? else {
            return Ok(Vec::new());
        };

        let now = ctx.now();
        let mut matched: Vec<_> = ctx
            .store
            .list_protocols()?
            .into_iter()
            .filter(|p| p.is_applicable_at(now) && p.matches(&latest.readings))
            .collect();
        matched.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.name.as_str().cmp(b.name.as_str()))
        });

        tracing::debug!(%assessment_id, matched = matched.len(), "protocols suggested");
        Ok(matched)
    }

    /// Apply a protocol's level and priority to an open assessment.
    ///
    /// # Errors
    ///
    /// - [`TriageError::Unauthorised`] if `caller` may not triage.
    /// - [`TriageError::ProtocolNotApplicable`] if the protocol is inactive or outside its
    ///   validity window.
    /// - [`TriageError::ProtocolAlreadyApplied`] if the protocol is already linked.
    pub fn apply(
        &self,
        caller: UserId,
        assessment_id: AssessmentId,
        protocol_id: ProtocolId,
    ) -> TriageResult<ProtocolApplication> {
        let ctx = &self.ctx;
        ctx.ensure_authorised(caller)?;

        let application = ctx.locks.assessments.with(assessment_id, || {
            let mut assessment = load_assessment(ctx, assessment_id)?;
            assessment.ensure_open()?;

            let protocol = load_protocol(ctx, protocol_id)?;
            let now = ctx.now();
            if !protocol.is_active {
                return Err(TriageError::ProtocolNotApplicable {
                    id: protocol_id,
                    reason: "protocol is inactive".into(),
                });
            }
            if !protocol.is_valid_at(now) {
                return Err(TriageError::ProtocolNotApplicable {
                    id: protocol_id,
                    reason: "protocol is outside its validity window".into(),
                });
            }
            if assessment.has_protocol(protocol_id) {
                return Err(TriageError::ProtocolAlreadyApplied {
                    assessment_id,
                    protocol_id,
                });
            }

            let record = ReassessmentRecord {
                id: ReassessmentId::new(),
                assessment_id,
                previous_level: assessment.level,
                new_level: protocol.level,
                previous_priority: assessment.priority,
                new_priority: protocol.priority,
                reason: ReassessmentReason::ProtocolDriven,
                created_at: now,
                assessor_id: caller,
                notes: Some(format!("{} v{}", protocol.name, protocol.version)),
                protocol_id: Some(protocol_id),
            };

            assessment.level = protocol.level;
            assessment.priority = protocol.priority;
            assessment.reassessment_count += 1;
            assessment.last_reassessed_at = Some(now);
            assessment.applied_protocols.push(AppliedProtocol {
                protocol_id,
                protocol_name: protocol.name.to_string(),
                applied_at: now,
                applied_by: caller,
            });

            let mut changes = ChangeSet::new();
            changes
                .put_assessment(assessment.clone())
                .append_reassessment(record.clone());
            commit_with_active_entry(ctx, &assessment, EntryUpdate::Refresh, changes, now)?;
            Ok(ProtocolApplication { assessment, record })
        });

        let application = match application {
            Ok(application) => application,
            Err(err) => {
                tracing::warn!(%assessment_id, %protocol_id, error = %err, "protocol not applied");
                return Err(err);
            }
        };

        tracing::info!(
            %assessment_id,
            %protocol_id,
            level = application.record.new_level.number(),
            "protocol applied"
        );

        if is_critical_level(application.record.new_level)
            && application
                .record
                .new_level
                .is_more_severe_than(application.record.previous_level)
        {
            ctx.notify(
                NotificationKind::Deterioration,
                format!(
                    "Protocol applied to assessment {}: level {} to level {}",
                    assessment_id, application.record.previous_level, application.record.new_level
                ),
            );
        }

        Ok(application)
    }

    /// Validate and add a protocol to the catalog.
    pub fn register(&self, new: NewProtocol) -> TriageResult<TriageProtocol> {
        let mut registered = self.register_all(vec![new])?;
        registered
            .pop()
            .ok_or_else(|| TriageError::Invariant("registration produced no protocol".into()))
    }

    /// Register a batch atomically. Name and version pairs must be unique in the catalog.
    fn register_all(&self, batch: Vec<NewProtocol>) -> TriageResult<Vec<TriageProtocol>> {
        let ctx = &self.ctx;
        let now = ctx.now();
        let protocols = batch
            .into_iter()
            .map(|new| build_protocol(new, now))
            .collect::<TriageResult<Vec<_>>>()?;

        ctx.locks.with_catalog(|| {
            let mut existing = ctx.store.list_protocols()?;
            let mut changes = ChangeSet::new();
            for protocol in &protocols {
                if existing
                    .iter()
                    .any(|p| p.name == protocol.name && p.version == protocol.version)
                {
                    return Err(TriageError::InvalidInput(format!(
                        "protocol '{}' version {} is already registered",
                        protocol.name, protocol.version
                    )));
                }
                existing.push(protocol.clone());
                changes.put_protocol(protocol.clone());
            }
            ctx.store.commit(changes)?;
            Ok(())
        })?;

        for protocol in &protocols {
            tracing::info!(protocol_id = %protocol.id, name = %protocol.name, "protocol registered");
        }
        Ok(protocols)
    }

    /// Parse a YAML catalog and register every protocol in it as one unit.
    pub fn load_catalog(&self, yaml_text: &str) -> TriageResult<Vec<TriageProtocol>> {
        self.register_all(parse_catalog(yaml_text)?)
    }

    pub fn load_catalog_file(&self, path: &Path) -> TriageResult<Vec<TriageProtocol>> {
        let protocols = self.register_all(read_catalog_file(path)?)?;
        tracing::info!(path = %path.display(), count = protocols.len(), "protocol catalog loaded");
        Ok(protocols)
    }

    pub fn deactivate(&self, id: ProtocolId) -> TriageResult<TriageProtocol> {
        self.update(id, |p| p.is_active = false)
    }

    /// Soft delete: the protocol disappears from every listing but stays linked to history.
    pub fn delete(&self, id: ProtocolId) -> TriageResult<()> {
        self.update(id, |p| p.is_deleted = true).map(|_| ())
    }

    fn update(
        &self,
        id: ProtocolId,
        change: impl FnOnce(&mut TriageProtocol),
    ) -> TriageResult<TriageProtocol> {
        let ctx = &self.ctx;
        ctx.locks.with_catalog(|| {
            let mut protocol = load_protocol(ctx, id)?;
            change(&mut protocol);
            let mut changes = ChangeSet::new();
            changes.put_protocol(protocol.clone());
            ctx.store.commit(changes)?;
            tracing::info!(
                protocol_id = %id,
                active = protocol.is_active,
                deleted = protocol.is_deleted,
                "protocol updated"
            );
            Ok(protocol)
        })
    }

    pub fn get(&self, id: ProtocolId) -> TriageResult<TriageProtocol> {
        load_protocol(&self.ctx, id)
    }

    /// Catalog listing by name. Soft-deleted protocols are never included.
    pub fn list(&self, include_inactive: bool) -> TriageResult<Vec<TriageProtocol>> {
        Ok(self
            .ctx
            .store
            .list_protocols()?
            .into_iter()
            .filter(|p| include_inactive || p.is_active)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Clock;
    use crate::test_support::{
        critical_vitals, fixture, intake, sample_vitals, urgent_vitals, NURSE, OUTSIDER,
    };
    use chrono::Duration;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hypoxia_protocol() -> NewProtocol {
        NewProtocol {
            name: "Hypoxia".into(),
            version: "1".into(),
            description: Some("Low oxygen saturation".into()),
            level: AcuityLevel::Emergent,
            priority: Some(Priority::new(1).unwrap()),
            valid_from: None,
            valid_to: None,
            criteria: vec![Criterion {
                sign: VitalSign::OxygenSaturation,
                operator: ComparisonOperator::Lt,
                value: 92.0,
            }],
            match_mode: MatchMode::All,
            required_actions: vec!["Start oxygen".into(), " ".into()],
            active: true,
        }
    }

    fn tachycardia_protocol() -> NewProtocol {
        NewProtocol {
            name: "Tachycardia".into(),
            criteria: vec![
                Criterion {
                    sign: VitalSign::HeartRate,
                    operator: ComparisonOperator::Gt,
                    value: 105.0,
                },
                Criterion {
                    sign: VitalSign::Temperature,
                    operator: ComparisonOperator::Ge,
                    value: 38.0,
                },
            ],
            match_mode: MatchMode::Any,
            level: AcuityLevel::Urgent,
            priority: None,
            ..hypoxia_protocol()
        }
    }

    const CATALOG: &str = r#"
protocols:
  - name: Sepsis screen
    version: "2"
    level: 2
    priority: 2
    match: all
    criteria:
      - sign: heart_rate
        operator: gt
        value: 100
      - sign: temperature
        operator: gt
        value: 38
    required_actions:
      - Take blood cultures
  - name: Reduced consciousness
    version: "1"
    level: 1
    criteria:
      - sign: consciousness
        operator: le
        value: 12
"#;

    #[test]
    fn test_criteria_matching_modes() {
        let hypoxia = build_protocol(hypoxia_protocol(), Utc::now()).unwrap();
        assert!(hypoxia.matches(&critical_vitals()));
        assert!(!hypoxia.matches(&sample_vitals()));
        assert!(!hypoxia.matches(&VitalSigns {
            heart_rate: Some(80),
            ..Default::default()
        }));

        let tachy = build_protocol(tachycardia_protocol(), Utc::now()).unwrap();
        assert!(tachy.matches(&urgent_vitals()));
        assert_eq!(tachy.priority, Priority::from(AcuityLevel::Urgent));

        let empty = build_protocol(
            NewProtocol {
                criteria: vec![],
                ..hypoxia_protocol()
            },
            Utc::now(),
        )
        .unwrap();
        assert!(!empty.matches(&critical_vitals()));
    }

    #[test]
    fn test_register_validates_and_rejects_duplicates() {
        let fx = fixture();
        let protocols = fx.engine.protocols();
        let registered = protocols.register(hypoxia_protocol()).unwrap();
        assert_eq!(registered.required_actions, vec!["Start oxygen".to_string()]);

        assert!(protocols.register(hypoxia_protocol()).is_err());

        let now = fx.clock.now();
        let backwards = NewProtocol {
            version: "2".into(),
            valid_from: Some(now),
            valid_to: Some(now - Duration::days(1)),
            ..hypoxia_protocol()
        };
        assert!(protocols.register(backwards).is_err());

        let unnamed = NewProtocol {
            name: " ".into(),
            ..hypoxia_protocol()
        };
        assert!(protocols.register(unnamed).is_err());
        assert_eq!(protocols.list(true).unwrap().len(), 1);
    }

    #[test]
    fn test_suggest_orders_by_priority_then_name() {
        let fx = fixture();
        let protocols = fx.engine.protocols();
        let tachy = protocols.register(tachycardia_protocol()).unwrap();
        let hypoxia = protocols.register(hypoxia_protocol()).unwrap();
        let inactive = protocols
            .register(NewProtocol {
                name: "Inactive".into(),
                active: false,
                ..hypoxia_protocol()
            })
            .unwrap();

        let vitals = VitalSigns {
            heart_rate: Some(110),
            oxygen_saturation: Some(91),
            ..sample_vitals()
        };
        let created = fx
            .engine
            .assessments()
            .create(NURSE, intake(42, vitals))
            .unwrap();

        let suggested: Vec<_> = protocols
            .suggest(created.assessment.id)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(suggested, vec![hypoxia.id, tachy.id]);
        assert!(!suggested.contains(&inactive.id));
    }

    #[test]
    fn test_suggest_skips_expired_protocols() {
        let fx = fixture();
        let now = fx.clock.now();
        let protocols = fx.engine.protocols();
        protocols
            .register(NewProtocol {
                valid_from: Some(now - Duration::days(10)),
                valid_to: Some(now - Duration::days(1)),
                ..hypoxia_protocol()
            })
            .unwrap();
        let created = fx
            .engine
            .assessments()
            .create(NURSE, intake(42, critical_vitals()))
            .unwrap();
        assert!(protocols.suggest(created.assessment.id).unwrap().is_empty());
    }

    #[test]
    fn test_apply_sets_level_links_protocol_and_audits() {
        let fx = fixture();
        let protocols = fx.engine.protocols();
        let hypoxia = protocols.register(hypoxia_protocol()).unwrap();
        let created = fx
            .engine
            .assessments()
            .create(NURSE, intake(42, sample_vitals()))
            .unwrap();
        let id = created.assessment.id;

        fx.clock.advance(Duration::minutes(3));
        let applied = protocols.apply(NURSE, id, hypoxia.id).unwrap();
        assert_eq!(applied.assessment.level, AcuityLevel::Emergent);
        assert_eq!(applied.assessment.priority.value(), 1);
        assert_eq!(applied.record.reason, ReassessmentReason::ProtocolDriven);
        assert_eq!(applied.record.protocol_id, Some(hypoxia.id));
        assert!(applied.assessment.has_protocol(hypoxia.id));

        let entry = fx.engine.queue().active_for(id).unwrap().unwrap();
        assert_eq!(entry.priority.value(), 1);
        assert_eq!(entry.level, AcuityLevel::Emergent);

        let err = protocols.apply(NURSE, id, hypoxia.id).unwrap_err();
        assert!(matches!(err, TriageError::ProtocolAlreadyApplied { .. }));
        assert_eq!(fx.engine.assessments().reassessments(id).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_rejects_inactive_unauthorised_and_closed() {
        let fx = fixture();
        let protocols = fx.engine.protocols();
        let hypoxia = protocols.register(hypoxia_protocol()).unwrap();
        let assessments = fx.engine.assessments();
        let created = assessments
            .create(NURSE, intake(42, sample_vitals()))
            .unwrap();
        let id = created.assessment.id;

        assert!(matches!(
            protocols.apply(OUTSIDER, id, hypoxia.id).unwrap_err(),
            TriageError::Unauthorised(_)
        ));

        protocols.deactivate(hypoxia.id).unwrap();
        assert!(matches!(
            protocols.apply(NURSE, id, hypoxia.id).unwrap_err(),
            TriageError::ProtocolNotApplicable { .. }
        ));

        let other = protocols.register(tachycardia_protocol()).unwrap();
        assessments.cancel(NURSE, id, "transferred").unwrap();
        assert!(protocols.apply(NURSE, id, other.id).is_err());
        assert_eq!(assessments.get(id).unwrap().level, created.assessment.level);
    }

    #[test]
    fn test_delete_is_soft_and_hides_protocol() {
        let fx = fixture();
        let protocols = fx.engine.protocols();
        let hypoxia = protocols.register(hypoxia_protocol()).unwrap();
        protocols.delete(hypoxia.id).unwrap();

        assert!(protocols.list(true).unwrap().is_empty());
        assert!(matches!(
            protocols.get(hypoxia.id).unwrap_err(),
            TriageError::ProtocolNotFound(_)
        ));
    }

    #[test]
    fn test_parse_catalog() {
        let parsed = parse_catalog(CATALOG).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].criteria.len(), 2);
        assert_eq!(parsed[0].match_mode, MatchMode::All);
        assert_eq!(parsed[1].level, AcuityLevel::Resuscitation);
        assert!(parsed[1].active);
    }

    #[test]
    fn test_parse_catalog_reports_failing_path() {
        let yaml = r#"
protocols:
  - name: Bad
    version: "1"
    level: 2
    criteria:
      - sign: heart_rate
        operator: gt
        value: 100
        colour: red
"#;
        match parse_catalog(yaml).unwrap_err() {
            TriageError::CatalogSchema { path, .. } => {
                assert!(path.starts_with("protocols"), "unexpected path {path}");
            }
            other => panic!("expected schema error, got {other:?}"),
        }

        let bad_level = "protocols:\n  - name: X\n    version: '1'\n    level: 9\n";
        assert!(matches!(
            parse_catalog(bad_level).unwrap_err(),
            TriageError::CatalogSchema { .. }
        ));
    }

    #[test]
    fn test_load_catalog_file_registers_all() {
        let fx = fixture();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let loaded = fx
            .engine
            .protocols()
            .load_catalog_file(file.path())
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(fx.engine.protocols().list(false).unwrap().len(), 2);

        // A second load would duplicate every entry and is rejected as a whole.
        assert!(fx.engine.protocols().load_catalog(CATALOG).is_err());
        assert_eq!(fx.engine.protocols().list(true).unwrap().len(), 2);
    }
}
