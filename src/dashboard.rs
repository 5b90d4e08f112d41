//! Headline figures for the dashboard, computed from cache snapshots.

use serde::Serialize;

use crate::models::{Alert, ComplianceTrends, Document};
use crate::ranking::SeverityCounts;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub average_compliance: f64,
    pub total_violations: u32,
    pub active_alerts: usize,
    pub document_count: usize,
    /// Breakdown of the active alerts.
    pub severity: SeverityCounts,
}

impl DashboardSummary {
    /// Collections that were never fetched count as empty.
    pub fn compute(
        documents: Option<&[Document]>,
        alerts: Option<&[Alert]>,
        trends: Option<&ComplianceTrends>,
    ) -> Self {
        let alerts = alerts.unwrap_or_default();
        let open: Vec<Alert> = crate::ranking::unresolved(alerts);

        Self {
            average_compliance: trends.map(|t| t.average_compliance).unwrap_or(0.0),
            total_violations: trends.map(|t| t.total_violations).unwrap_or(0),
            active_alerts: open.len(),
            document_count: documents.map_or(0, <[Document]>::len),
            severity: SeverityCounts::tally(&open),
        }
    }
}
