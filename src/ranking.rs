//! Display ordering and tallies for the alert collection.
//!
//! Pure functions over a slice of alerts. Ordering depends only on the
//! input order and severities, never on fetch timing.

use serde::Serialize;

use crate::models::{Alert, Severity};

/// Alerts ordered by severity rank, most severe first.
///
/// Stable: alerts of equal rank keep their input order, so re-ranking the
/// same collection never shuffles equal-severity rows. Unknown severities
/// sort after every known one.
pub fn rank_alerts(alerts: &[Alert]) -> Vec<Alert> {
    let mut ranked = alerts.to_vec();
    ranked.sort_by_key(|alert| alert.severity.rank());
    ranked
}

/// Unresolved alerts only, input order kept.
pub fn unresolved(alerts: &[Alert]) -> Vec<Alert> {
    alerts.iter().filter(|a| !a.resolved).cloned().collect()
}

/// Per-severity counts for badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn tally(alerts: &[Alert]) -> Self {
        let mut counts = Self::default();
        for alert in alerts {
            match alert.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Other(_) => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.unknown
    }
}
