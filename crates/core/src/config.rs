//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the engine. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses. The `*_from_env_value` helpers take the raw variable value so binaries do
//! the actual environment lookup.

use crate::acuity::SlaPolicy;
use crate::constants::DEFAULT_OVERDUE_SCAN_SECS;
use crate::error::{TriageError, TriageResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use triage_types::UserId;

/// Engine configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct TriageConfig {
    sla: SlaPolicy,
    alert_recipients: Vec<UserId>,
    protocol_catalog: Option<PathBuf>,
    overdue_scan_interval: Duration,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            sla: SlaPolicy::default(),
            alert_recipients: Vec::new(),
            protocol_catalog: None,
            overdue_scan_interval: Duration::from_secs(DEFAULT_OVERDUE_SCAN_SECS),
        }
    }
}

impl TriageConfig {
    /// Create a new `TriageConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if the scan interval is zero or the protocol catalog
    /// path does not point at a file.
    pub fn new(
        sla: SlaPolicy,
        alert_recipients: Vec<UserId>,
        protocol_catalog: Option<PathBuf>,
        overdue_scan_interval: Duration,
    ) -> TriageResult<Self> {
        if overdue_scan_interval.is_zero() {
            return Err(TriageError::InvalidInput(
                "overdue scan interval must be greater than zero".into(),
            ));
        }

        if let Some(path) = &protocol_catalog {
            if !path.is_file() {
                return Err(TriageError::InvalidInput(format!(
                    "protocol catalog is not a file: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            sla,
            alert_recipients,
            protocol_catalog,
            overdue_scan_interval,
        })
    }

    pub fn sla(&self) -> &SlaPolicy {
        &self.sla
    }

    /// Staff who receive critical-arrival, deterioration and SLA-breach notifications.
    pub fn alert_recipients(&self) -> &[UserId] {
        &self.alert_recipients
    }

    pub fn protocol_catalog(&self) -> Option<&Path> {
        self.protocol_catalog.as_deref()
    }

    pub fn overdue_scan_interval(&self) -> Duration {
        self.overdue_scan_interval
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the SLA policy from an optional `"l2,l3,l4,l5"` minutes string.
///
/// If `value` is `None` or empty/whitespace, returns the default policy.
pub fn sla_policy_from_env_value(value: Option<String>) -> TriageResult<SlaPolicy> {
    let Some(value) = non_blank(value) else {
        return Ok(SlaPolicy::default());
    };

    let minutes = value
        .split(',')
        .map(|part| {
            part.trim().parse::<i64>().map_err(|_| {
                TriageError::InvalidInput(format!("invalid SLA minutes value: '{part}'"))
            })
        })
        .collect::<TriageResult<Vec<_>>>()?;

    let minutes: [i64; 4] = minutes.try_into().map_err(|_| {
        TriageError::InvalidInput(
            "SLA minutes must list exactly four values (levels 2 to 5)".into(),
        )
    })?;

    SlaPolicy::new(minutes)
}

/// Parse a comma-separated list of user ids. Empty input yields an empty list.
pub fn user_ids_from_env_value(value: Option<String>) -> TriageResult<Vec<UserId>> {
    let Some(value) = non_blank(value) else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.parse::<UserId>()
                .map_err(|e| TriageError::InvalidInput(e.to_string()))
        })
        .collect()
}

/// Parse the overdue scan interval in seconds, falling back to the default.
pub fn scan_interval_from_env_value(value: Option<String>) -> TriageResult<Duration> {
    let Some(value) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_OVERDUE_SCAN_SECS));
    };

    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| TriageError::InvalidInput(format!("invalid scan interval: '{value}'")))
}

/// Parse an optional protocol catalog path.
pub fn protocol_catalog_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acuity::AcuityLevel;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sla_policy_defaults_when_unset() {
        assert_eq!(sla_policy_from_env_value(None).unwrap(), SlaPolicy::default());
        assert_eq!(
            sla_policy_from_env_value(Some("  ".into())).unwrap(),
            SlaPolicy::default()
        );
    }

    #[test]
    fn test_sla_policy_parses_four_values() {
        let policy = sla_policy_from_env_value(Some("10, 20,40,90".into())).unwrap();
        assert_eq!(
            policy.interval(AcuityLevel::Urgent),
            Some(chrono::Duration::minutes(20))
        );
        assert!(sla_policy_from_env_value(Some("10,20,40".into())).is_err());
        assert!(sla_policy_from_env_value(Some("10,x,40,90".into())).is_err());
    }

    #[test]
    fn test_user_ids_parse() {
        let ids = user_ids_from_env_value(Some("7, 9,".into())).unwrap();
        assert_eq!(ids, vec![UserId(7), UserId(9)]);
        assert!(user_ids_from_env_value(None).unwrap().is_empty());
        assert!(user_ids_from_env_value(Some("seven".into())).is_err());
    }

    #[test]
    fn test_scan_interval_parse() {
        assert_eq!(
            scan_interval_from_env_value(Some("5".into())).unwrap(),
            Duration::from_secs(5)
        );
        assert_eq!(
            scan_interval_from_env_value(None).unwrap(),
            Duration::from_secs(DEFAULT_OVERDUE_SCAN_SECS)
        );
    }

    #[test]
    fn test_config_rejects_missing_catalog_and_zero_interval() {
        let missing = TriageConfig::new(
            SlaPolicy::default(),
            vec![],
            Some(PathBuf::from("/definitely/not/here.yaml")),
            Duration::from_secs(1),
        );
        assert!(missing.is_err());

        let zero = TriageConfig::new(SlaPolicy::default(), vec![], None, Duration::ZERO);
        assert!(zero.is_err());

        let file = NamedTempFile::new().unwrap();
        let ok = TriageConfig::new(
            SlaPolicy::default(),
            vec![UserId(1)],
            Some(file.path().to_path_buf()),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(ok.protocol_catalog(), Some(file.path()));
        assert_eq!(ok.alert_recipients(), &[UserId(1)]);
    }
}
