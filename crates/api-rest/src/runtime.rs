//! Startup wiring shared by the REST binary and the workspace runtime.
//!
//! All environment lookups happen here, once, before any request is served.

use std::sync::Arc;
use triage_core::config::{
    protocol_catalog_from_env_value, scan_interval_from_env_value, sla_policy_from_env_value,
    user_ids_from_env_value,
};
use triage_core::constants::DEFAULT_REST_ADDR;
use triage_core::{
    AcceptAllPatients, Collaborators, MemoryStore, StaticAuthorizer, SystemClock, TracingNotifier,
    TriageConfig, TriageEngine,
};

/// A ready engine plus the address to serve it on.
pub struct Runtime {
    pub engine: TriageEngine,
    pub rest_addr: String,
}

/// Resolve configuration from `TRIAGE_*` variables and build the engine.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `TRIAGE_SLA_MINUTES`: Reassessment minutes for levels 2 to 5 (default: "15,30,60,120")
/// - `TRIAGE_PROTOCOL_CATALOG`: Optional YAML catalog loaded at startup
/// - `TRIAGE_AUTHORISED_USERS`: Comma-separated user ids allowed to triage
/// - `TRIAGE_ALERT_RECIPIENTS`: Comma-separated user ids that receive alerts
/// - `TRIAGE_OVERDUE_SCAN_SECS`: Seconds between overdue scans (default: 60)
///
/// # Errors
/// Returns an error if any variable is malformed, the catalog path is not a file, or the
/// catalog fails validation.
pub fn runtime_from_env() -> anyhow::Result<Runtime> {
    let rest_addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let sla = sla_policy_from_env_value(std::env::var("TRIAGE_SLA_MINUTES").ok())?;
    let authorised = user_ids_from_env_value(std::env::var("TRIAGE_AUTHORISED_USERS").ok())?;
    let recipients = user_ids_from_env_value(std::env::var("TRIAGE_ALERT_RECIPIENTS").ok())?;
    let scan_interval =
        scan_interval_from_env_value(std::env::var("TRIAGE_OVERDUE_SCAN_SECS").ok())?;
    let catalog = protocol_catalog_from_env_value(std::env::var("TRIAGE_PROTOCOL_CATALOG").ok());

    if authorised.is_empty() {
        tracing::warn!("TRIAGE_AUTHORISED_USERS is empty; every mutating request will be refused");
    }

    let cfg = Arc::new(TriageConfig::new(sla, recipients, catalog, scan_interval)?);

    let engine = TriageEngine::new(
        cfg.clone(),
        Arc::new(MemoryStore::new()),
        Collaborators {
            authorizer: Arc::new(StaticAuthorizer::new(authorised)),
            patients: Arc::new(AcceptAllPatients),
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
        },
    );

    if let Some(path) = cfg.protocol_catalog() {
        let loaded = engine.protocols().load_catalog_file(path)?;
        tracing::info!(
            count = loaded.len(),
            "-- Loaded protocol catalog from {}",
            path.display()
        );
    }

    Ok(Runtime { engine, rest_addr })
}
