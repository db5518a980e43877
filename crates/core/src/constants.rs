//! Constants used throughout the triage core crate.
//!
//! Clinical thresholds live next to the rules that use them (see `vitals` and `acuity`); this
//! module holds the operational defaults that configuration falls back to.

/// Default SLA (minutes until mandatory reassessment) for acuity level 2.
pub const DEFAULT_SLA_LEVEL_2_MINUTES: i64 = 15;

/// Default SLA for acuity level 3.
pub const DEFAULT_SLA_LEVEL_3_MINUTES: i64 = 30;

/// Default SLA for acuity level 4.
pub const DEFAULT_SLA_LEVEL_4_MINUTES: i64 = 60;

/// Default SLA for acuity level 5.
pub const DEFAULT_SLA_LEVEL_5_MINUTES: i64 = 120;

/// Default interval between periodic overdue scans in the runtime binary.
pub const DEFAULT_OVERDUE_SCAN_SECS: u64 = 60;

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Priority values at or below this are reported by the urgent filter.
pub const URGENT_PRIORITY_THRESHOLD: u8 = 2;

/// Maximum length for free-text notes and reasons.
pub const MAX_NOTES_LEN: usize = 4_000;
