//! Scripted queue simulation on a manual clock.
//!
//! A scenario is a YAML document with a start time and a list of steps. Each step drives one
//! engine operation; the runner returns a transcript of what happened, including any
//! notifications the step produced.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use triage_core::{
    AcceptAllPatients, AcuityLevel, AssessmentId, Clock, Collaborators, Completion, DepartmentId,
    DoctorId, ManualClock, MemoryStore, NewAssessment, PatientId, ReassessmentReason,
    RecordingNotifier, SlaPolicy, StaticAuthorizer, TriageConfig, TriageEngine, TriageError,
    TriageQueueEntry, UserId, VitalSigns,
};

/// Staff member every scripted action is performed as.
const SIMULATION_NURSE: UserId = UserId(1);

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("failed to read scenario: {0}")]
    Read(#[from] std::io::Error),
    #[error("scenario schema mismatch at {path}: {message}")]
    Schema { path: String, message: String },
    #[error("step {step}: unknown patient label '{label}'")]
    UnknownLabel { step: usize, label: String },
    #[error("step {step}: no active protocol named '{name}'")]
    UnknownProtocol { step: usize, name: String },
    #[error("step {step}: {source}")]
    Step {
        step: usize,
        #[source]
        source: TriageError,
    },
    #[error(transparent)]
    Setup(#[from] TriageError),
}

// ============================================================================
// Scenario schema
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub start: DateTime<Utc>,
    /// Minutes for levels 2 to 5; defaults to the standard policy.
    #[serde(default)]
    pub sla_minutes: Option<[i64; 4]>,
    /// Protocol catalog, relative to the scenario file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Arrive {
        label: String,
        patient: u64,
        #[serde(default = "default_complaint")]
        complaint: String,
        vitals: VitalSigns,
        #[serde(default)]
        department: Option<u64>,
    },
    Advance {
        minutes: i64,
    },
    CallNext {
        #[serde(default)]
        department: Option<u64>,
    },
    Start {
        label: String,
    },
    Reassess {
        label: String,
        level: AcuityLevel,
        reason: ReassessmentReason,
    },
    Vitals {
        label: String,
        vitals: VitalSigns,
    },
    ApplyProtocol {
        label: String,
        protocol: String,
    },
    Complete {
        label: String,
        #[serde(default)]
        department: Option<u64>,
        #[serde(default)]
        doctor: Option<u64>,
    },
    Cancel {
        label: String,
        reason: String,
    },
    Reorder {
        #[serde(default)]
        department: Option<u64>,
    },
    Scan {},
    Stats {
        #[serde(default)]
        department: Option<u64>,
    },
}

fn default_complaint() -> String {
    "Unspecified".into()
}

/// Parse a scenario, reporting the failing field path on schema errors.
pub fn parse_scenario(yaml_text: &str) -> Result<Scenario, SimulationError> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        SimulationError::Schema {
            path: if path.is_empty() { "<root>".into() } else { path },
            message: err.into_inner().to_string(),
        }
    })
}

pub fn read_scenario_file(path: &Path) -> Result<Scenario, SimulationError> {
    let text = std::fs::read_to_string(path)?;
    parse_scenario(&text)
}

// ============================================================================
// Runner
// ============================================================================

struct Simulation {
    engine: TriageEngine,
    clock: Arc<ManualClock>,
    notifier: Arc<RecordingNotifier>,
    labels: HashMap<String, AssessmentId>,
    seen_notifications: usize,
    transcript: Vec<String>,
}

/// Run a scenario and return its transcript.
///
/// `base_dir` resolves a relative catalog path.
pub fn run_scenario(scenario: Scenario, base_dir: &Path) -> Result<Vec<String>, SimulationError> {
    let sla = match scenario.sla_minutes {
        Some(minutes) => SlaPolicy::new(minutes)?,
        None => SlaPolicy::default(),
    };
    let catalog = scenario.catalog.map(|p| base_dir.join(p));
    let cfg = TriageConfig::new(
        sla,
        vec![SIMULATION_NURSE],
        catalog,
        std::time::Duration::from_secs(60),
    )?;

    let clock = Arc::new(ManualClock::new(scenario.start));
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TriageEngine::new(
        Arc::new(cfg),
        Arc::new(MemoryStore::new()),
        Collaborators {
            authorizer: Arc::new(StaticAuthorizer::new([SIMULATION_NURSE])),
            patients: Arc::new(AcceptAllPatients),
            notifier: notifier.clone(),
            clock: clock.clone(),
        },
    );

    let mut sim = Simulation {
        engine,
        clock,
        notifier,
        labels: HashMap::new(),
        seen_notifications: 0,
        transcript: Vec::new(),
    };

    if let Some(path) = sim.engine.config().protocol_catalog() {
        let loaded = sim.engine.protocols().load_catalog_file(path)?;
        sim.log(format!("loaded {} protocol(s)", loaded.len()));
    }

    for (index, step) in scenario.steps.into_iter().enumerate() {
        let number = index + 1;
        sim.run_step(number, step)?;
        sim.drain_notifications();
    }

    Ok(sim.transcript)
}

fn department(id: Option<u64>) -> Option<DepartmentId> {
    id.map(DepartmentId)
}

fn describe(entry: &TriageQueueEntry) -> String {
    format!(
        "patient {} (level {}, priority {})",
        entry.patient_id, entry.level, entry.priority
    )
}

impl Simulation {
    fn log(&mut self, line: String) {
        let stamp = self.clock.now().format("%H:%M").to_string();
        self.transcript.push(format!("[{stamp}] {line}"));
    }

    fn label(&self, step: usize, label: &str) -> Result<AssessmentId, SimulationError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| SimulationError::UnknownLabel {
                step,
                label: label.to_owned(),
            })
    }

    fn drain_notifications(&mut self) {
        let sent = self.notifier.sent();
        for notification in sent.iter().skip(self.seen_notifications) {
            let line = format!(
                "notify {:?}: {}",
                notification.kind, notification.message
            );
            self.log(line);
        }
        self.seen_notifications = sent.len();
    }

    fn run_step(&mut self, step: usize, action: Step) -> Result<(), SimulationError> {
        let at = |source: TriageError| SimulationError::Step { step, source };
        let engine = self.engine.clone();

        match action {
            Step::Arrive {
                label,
                patient,
                complaint,
                vitals,
                department: target,
            } => {
                let created = engine
                    .assessments()
                    .create(
                        SIMULATION_NURSE,
                        NewAssessment {
                            patient_id: PatientId(patient),
                            chief_complaint: complaint,
                            vitals,
                            notes: None,
                            arrived_at: None,
                            isolation: None,
                            target_department: department(target),
                            target_doctor: None,
                        },
                    )
                    .map_err(at)?;
                self.labels.insert(label.clone(), created.assessment.id);
                let line = format!(
                    "arrive {label}: {} queued at position {}",
                    describe(&created.queue_entry),
                    created.queue_entry.position
                );
                self.log(line);
            }
            Step::Advance { minutes } => {
                self.clock.advance(Duration::minutes(minutes));
                self.log(format!("advance {minutes} min"));
            }
            Step::CallNext { department: dept } => {
                match engine
                    .queue()
                    .call_next(SIMULATION_NURSE, department(dept))
                    .map_err(at)?
                {
                    Some(entry) => {
                        let line = format!("call next: {}", describe(&entry));
                        self.log(line);
                    }
                    None => self.log("call next: nobody waiting".into()),
                }
            }
            Step::Start { label } => {
                let id = self.label(step, &label)?;
                let entry = engine
                    .queue()
                    .active_for(id)
                    .map_err(at)?
                    .ok_or(SimulationError::Step {
                        step,
                        source: TriageError::InvalidInput(format!("{label} is not queued")),
                    })?;
                engine
                    .queue()
                    .start(SIMULATION_NURSE, entry.id)
                    .map_err(at)?;
                self.log(format!("start {label}"));
            }
            Step::Reassess {
                label,
                level,
                reason,
            } => {
                let id = self.label(step, &label)?;
                let record = engine
                    .assessments()
                    .reassess(SIMULATION_NURSE, id, level, reason, None)
                    .map_err(at)?;
                self.log(format!(
                    "reassess {label}: level {} -> {}, priority {} -> {}",
                    record.previous_level,
                    record.new_level,
                    record.previous_priority,
                    record.new_priority
                ));
            }
            Step::Vitals { label, vitals } => {
                let id = self.label(step, &label)?;
                engine
                    .assessments()
                    .record_vital_signs(SIMULATION_NURSE, id, vitals)
                    .map_err(at)?;
                self.log(format!("vitals recorded for {label}"));
            }
            Step::ApplyProtocol { label, protocol } => {
                let id = self.label(step, &label)?;
                let found = engine
                    .protocols()
                    .list(false)
                    .map_err(at)?
                    .into_iter()
                    .find(|p| p.name.as_str() == protocol)
                    .ok_or_else(|| SimulationError::UnknownProtocol {
                        step,
                        name: protocol.clone(),
                    })?;
                let applied = engine
                    .protocols()
                    .apply(SIMULATION_NURSE, id, found.id)
                    .map_err(at)?;
                self.log(format!(
                    "apply {protocol} to {label}: level {}",
                    applied.assessment.level
                ));
            }
            Step::Complete {
                label,
                department: dept,
                doctor,
            } => {
                let id = self.label(step, &label)?;
                engine
                    .assessments()
                    .complete(
                        SIMULATION_NURSE,
                        id,
                        Completion {
                            department: department(dept),
                            doctor: doctor.map(DoctorId),
                        },
                    )
                    .map_err(at)?;
                self.log(format!("complete {label}"));
            }
            Step::Cancel { label, reason } => {
                let id = self.label(step, &label)?;
                engine
                    .assessments()
                    .cancel(SIMULATION_NURSE, id, &reason)
                    .map_err(at)?;
                self.log(format!("cancel {label}: {reason}"));
            }
            Step::Reorder { department: dept } => {
                let positions = engine
                    .queue()
                    .reorder_by_priority(department(dept))
                    .map_err(at)?;
                self.log(format!("reorder: {} waiting", positions.len()));
            }
            Step::Scan {} => {
                let overdue = engine.monitor().scan_overdue().map_err(at)?;
                self.log(format!("scan: {} overdue", overdue.len()));
            }
            Step::Stats { department: dept } => {
                let stats = engine.queue().stats(department(dept)).map_err(at)?;
                let wait = stats
                    .average_wait_minutes
                    .map(|m| format!("{m:.1} min"))
                    .unwrap_or_else(|| "n/a".into());
                self.log(format!(
                    "stats: waiting {}, called {}, in progress {}, completed {}, overdue {}, urgent {}, average wait {}",
                    stats.waiting,
                    stats.called,
                    stats.in_progress,
                    stats.completed,
                    stats.overdue,
                    stats.urgent,
                    wait
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
start: 2026-03-02T08:00:00Z
steps:
  - arrive: { label: a, patient: 1, vitals: { heart_rate: 110 } }
  - arrive: { label: b, patient: 2, vitals: { heart_rate: 110 } }
  - arrive: { label: c, patient: 42, vitals: { oxygen_saturation: 88, heart_rate: 70 } }
  - call_next: {}
  - advance: { minutes: 30 }
  - scan: {}
  - reassess: { label: a, level: 2, reason: deterioration }
  - call_next: {}
  - complete: { label: c, department: 4 }
  - stats: {}
"#;

    #[test]
    fn test_scenario_runs_in_dispatch_order() {
        let scenario = parse_scenario(SCENARIO).unwrap();
        let transcript = run_scenario(scenario, Path::new(".")).unwrap();

        let calls: Vec<&String> = transcript
            .iter()
            .filter(|l| l.contains("call next"))
            .collect();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("patient 42 (level 1, priority 1)"));
        assert!(calls[1].contains("patient 1 (level 2, priority 2)"));

        assert!(transcript.iter().any(|l| l.contains("scan: 2 overdue")));
        assert!(transcript.iter().any(|l| l.starts_with("[08:30]")));
        assert!(transcript
            .iter()
            .any(|l| l.contains("notify") && l.contains("overdue")));
    }

    #[test]
    fn test_schema_error_names_the_field() {
        let err = parse_scenario(
            "start: 2026-03-02T08:00:00Z\nsteps:\n  - arrive: { label: a, patient: one, vitals: {} }\n",
        )
        .unwrap_err();
        match err {
            SimulationError::Schema { path, .. } => assert!(path.starts_with("steps[0]")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_label_is_reported_with_step() {
        let scenario = parse_scenario(
            "start: 2026-03-02T08:00:00Z\nsteps:\n  - start: { label: ghost }\n",
        )
        .unwrap();
        let err = run_scenario(scenario, Path::new(".")).unwrap_err();
        assert!(matches!(err, SimulationError::UnknownLabel { step: 1, .. }));
    }
}
