use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One day of the compliance time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceTrendPoint {
    /// `YYYY-MM-DD`; series are ascending by this field.
    pub date: String,
    pub compliance_percentage: f64,
    pub violations: u32,
    pub inspections: u32,
}

/// Aggregated safety figures attached to the trends payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyMetrics {
    #[serde(default)]
    pub total_metrics_tracked: u32,
    #[serde(default)]
    pub threshold_exceeded_count: u32,
    #[serde(default)]
    pub compliance_rate: f64,
    #[serde(default)]
    pub average_deviation: f64,
}

/// The compliance trends collection as served by the analytics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceTrends {
    /// Chronological order is a caller invariant; the client never re-sorts.
    #[serde(default)]
    pub trends: Vec<ComplianceTrendPoint>,
    #[serde(default)]
    pub violations_by_category: HashMap<String, u32>,
    #[serde(default)]
    pub average_compliance: f64,
    #[serde(default)]
    pub total_violations: u32,
    #[serde(default)]
    pub safety_metrics: Option<SafetyMetrics>,
}

impl ComplianceTrends {
    /// Whether the series is in ascending date order.
    pub fn is_chronological(&self) -> bool {
        first_out_of_order(&self.trends).is_none()
    }
}

/// Index of the first point whose date precedes its predecessor's.
///
/// ISO dates compare correctly as strings, so no parsing is needed.
pub fn first_out_of_order(points: &[ComplianceTrendPoint]) -> Option<usize> {
    points
        .windows(2)
        .position(|pair| pair[1].date < pair[0].date)
        .map(|i| i + 1)
}
