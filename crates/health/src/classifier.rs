//! Snapshot → tri-state health signal.
//!
//! Pure and deterministic: the same snapshot and `now` always classify the
//! same way. Critical conditions are checked first, so the most severe wins.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::snapshot::HealthSnapshot;

/// Data older than this is critical.
pub const CRITICAL_AGE_SECS: i64 = 600;
/// Data older than this is a warning.
pub const WARNING_AGE_SECS: i64 = 300;
pub const CRITICAL_ERROR_RATE: f64 = 0.5;
pub const WARNING_ERROR_RATE: f64 = 0.2;
/// More consecutive failures than this is critical.
pub const CRITICAL_CONSECUTIVE_FAILURES: u32 = 2;

/// Ordered by severity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn color(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "#16a34a",
            HealthStatus::Warning => "#f59e0b",
            HealthStatus::Critical => "#dc2626",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "check-circle",
            HealthStatus::Warning => "alert-triangle",
            HealthStatus::Critical => "alert-octagon",
        }
    }

    /// Whether the indicator should pulse. Only critical escalates.
    pub fn pulses(&self) -> bool {
        matches!(self, HealthStatus::Critical)
    }
}

impl core::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("healthy"),
            HealthStatus::Warning => f.write_str("warning"),
            HealthStatus::Critical => f.write_str("critical"),
        }
    }
}

/// What the status indicator renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub color: &'static str,
    pub icon: &'static str,
    pub description: String,
    pub pulses: bool,
    pub age_secs: i64,
    pub error_rate: f64,
    pub consecutive_failures: u32,
}

/// `fail / max(1, ok + fail)`.
pub fn error_rate(snapshot: &HealthSnapshot) -> f64 {
    let total = snapshot.ok_count.saturating_add(snapshot.fail_count).max(1);
    snapshot.fail_count as f64 / total as f64
}

/// Seconds since the last update; a timestamp in the future counts as fresh.
pub fn age_secs(snapshot: &HealthSnapshot, now: DateTime<Utc>) -> i64 {
    (now - snapshot.last_updated_at).num_seconds().max(0)
}

pub fn classify(snapshot: &HealthSnapshot, now: DateTime<Utc>) -> HealthReport {
    let age = age_secs(snapshot, now);
    let rate = error_rate(snapshot);
    let streak = snapshot.consecutive_failures;

    let (status, description) = if age > CRITICAL_AGE_SECS {
        (
            HealthStatus::Critical,
            format!("FX rates are stale: last update {} ago", human_age(age)),
        )
    } else if rate > CRITICAL_ERROR_RATE {
        (
            HealthStatus::Critical,
            format!("FX feed failing: {:.0}% of refreshes failed", rate * 100.0),
        )
    } else if streak > CRITICAL_CONSECUTIVE_FAILURES {
        (
            HealthStatus::Critical,
            format!("FX feed failing: {streak} refreshes in a row failed"),
        )
    } else if age > WARNING_AGE_SECS {
        (
            HealthStatus::Warning,
            format!("FX rates may be delayed: last update {} ago", human_age(age)),
        )
    } else if rate > WARNING_ERROR_RATE {
        (
            HealthStatus::Warning,
            format!("FX feed unstable: {:.0}% of refreshes failed", rate * 100.0),
        )
    } else if snapshot.fail_count > 0 {
        (
            HealthStatus::Warning,
            format!(
                "FX feed recovered from {} failed refresh{}",
                snapshot.fail_count,
                if snapshot.fail_count == 1 { "" } else { "es" }
            ),
        )
    } else {
        (HealthStatus::Healthy, "FX rates are live".to_string())
    };

    HealthReport {
        status,
        color: status.color(),
        icon: status.icon(),
        description,
        pulses: status.pulses(),
        age_secs: age,
        error_rate: rate,
        consecutive_failures: streak,
    }
}

fn human_age(secs: i64) -> String {
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s => format!("{}h{:02}m", s / 3600, (s % 3600) / 60),
    }
}
