mod simulate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use triage_core::config::sla_policy_from_env_value;
use triage_core::{
    compute_priority, evaluate, AcceptAllPatients, AcuityLevel, Collaborators,
    MemoryStore, StaticAuthorizer, SystemClock, TracingNotifier, TriageConfig, TriageEngine,
    VitalSigns,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Triage assessment and priority queue CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a set of vital signs
    Evaluate {
        /// Systolic blood pressure (mmHg)
        #[arg(long)]
        systolic: Option<u16>,
        /// Diastolic blood pressure (mmHg)
        #[arg(long)]
        diastolic: Option<u16>,
        /// Heart rate (bpm)
        #[arg(long)]
        heart_rate: Option<u16>,
        /// Respiratory rate (breaths/min)
        #[arg(long)]
        respiratory_rate: Option<u16>,
        /// Temperature (°C)
        #[arg(long)]
        temperature: Option<f64>,
        /// Oxygen saturation (%)
        #[arg(long)]
        spo2: Option<u8>,
        /// Glasgow Coma Scale (3-15)
        #[arg(long)]
        gcs: Option<u8>,
    },
    /// Print the reassessment interval for each acuity level
    Sla {
        /// Minutes for levels 2 to 5, comma-separated (e.g. "15,30,60,120")
        #[arg(long)]
        minutes: Option<String>,
    },
    /// Protocol catalog tools
    Protocols {
        #[command(subcommand)]
        command: ProtocolCommands,
    },
    /// Run a scripted queue simulation on a manual clock
    Simulate {
        /// Scenario YAML file
        scenario: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProtocolCommands {
    /// Validate a YAML protocol catalog without starting the server
    Validate {
        /// Catalog YAML file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Evaluate {
            systolic,
            diastolic,
            heart_rate,
            respiratory_rate,
            temperature,
            spo2,
            gcs,
        }) => {
            let vitals = VitalSigns {
                systolic_bp: systolic,
                diastolic_bp: diastolic,
                heart_rate,
                respiratory_rate,
                temperature,
                oxygen_saturation: spo2,
                consciousness: gcs,
            };
            match vitals.validate() {
                Ok(()) => {
                    let evaluation = evaluate(&vitals);
                    let priority = compute_priority(evaluation.suggested_level, Some(&vitals));
                    println!("Status: {}", evaluation.status.as_str());
                    println!("Acuity level: {}", evaluation.suggested_level);
                    println!("Priority: {}", priority);
                    for finding in &evaluation.findings {
                        println!(
                            "  {} = {} ({})",
                            finding.sign,
                            finding.value,
                            finding.status.as_str()
                        );
                    }
                }
                Err(e) => eprintln!("Error evaluating vital signs: {}", e),
            }
        }
        Some(Commands::Sla { minutes }) => match sla_policy_from_env_value(minutes) {
            Ok(policy) => {
                for level in AcuityLevel::ALL {
                    match policy.interval(level) {
                        Some(interval) => println!(
                            "Level {}: reassess every {} min",
                            level,
                            interval.num_minutes()
                        ),
                        None => println!("Level {}: immediate care, no timer", level),
                    }
                }
            }
            Err(e) => eprintln!("Error reading SLA minutes: {}", e),
        },
        Some(Commands::Protocols {
            command: ProtocolCommands::Validate { file },
        }) => match validate_catalog(&file) {
            Ok(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Err(e) => {
                eprintln!("Error validating catalog {}: {}", file.display(), e);
                std::process::exit(1);
            }
        },
        Some(Commands::Simulate { scenario }) => {
            let base_dir = scenario.parent().unwrap_or_else(|| Path::new("."));
            match simulate::read_scenario_file(&scenario)
                .and_then(|parsed| simulate::run_scenario(parsed, base_dir))
            {
                Ok(transcript) => {
                    for line in transcript {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    eprintln!("Error running scenario: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("Use 'triage --help' for commands");
        }
    }

    Ok(())
}

/// Load the catalog into a scratch engine so schema, duplicate and window checks all run.
fn validate_catalog(file: &Path) -> Result<Vec<String>, triage_core::TriageError> {
    let engine = TriageEngine::new(
        Arc::new(TriageConfig::default()),
        Arc::new(MemoryStore::new()),
        Collaborators {
            authorizer: Arc::new(StaticAuthorizer::default()),
            patients: Arc::new(AcceptAllPatients),
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
        },
    );

    let loaded = engine.protocols().load_catalog_file(file)?;
    let mut lines = vec![format!("{} protocol(s) valid", loaded.len())];
    for protocol in loaded {
        lines.push(format!(
            "  {} v{}: level {}, priority {}, {} criteria{}",
            protocol.name,
            protocol.version,
            protocol.level,
            protocol.priority,
            protocol.criteria.len(),
            if protocol.is_active { "" } else { " (inactive)" }
        ));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_catalog_lists_protocols() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "protocols:\n  - name: Hypoxia\n    version: \"1\"\n    level: 2\n    criteria:\n      - {{ sign: oxygen_saturation, operator: lt, value: 90 }}\n"
        )
        .unwrap();

        let lines = validate_catalog(file.path()).unwrap();
        assert_eq!(lines[0], "1 protocol(s) valid");
        assert!(lines[1].contains("Hypoxia v1: level 2, priority 2, 1 criteria"));
    }

    #[test]
    fn test_validate_catalog_rejects_duplicates() {
        let mut file = NamedTempFile::new().unwrap();
        let entry = "  - name: Hypoxia\n    version: \"1\"\n    level: 2\n    criteria: []\n";
        write!(file, "protocols:\n{entry}{entry}").unwrap();

        assert!(validate_catalog(file.path()).is_err());
    }
}
