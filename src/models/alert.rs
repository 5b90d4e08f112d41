use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::Severity;

/// An alert produced by the backend. The client only reads alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "alert_id")]
    pub id: String,
    pub severity: Severity,
    /// Free-form category, e.g. `ThresholdExceeded`.
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    /// Creation timestamp as sent by the backend (ISO 8601).
    pub timestamp: String,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub resolved_at: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub metric: Option<String>,
}

impl Alert {
    /// Parsed creation time. Naive timestamps are read as UTC.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.timestamp)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_deserializes_backend_field_names() {
        let json = r#"{
            "alert_id": "ALERT-7",
            "type": "ThresholdExceeded",
            "message": "NOx exceeded threshold",
            "severity": "HIGH",
            "timestamp": "2025-05-02T10:15:00+00:00",
            "resolved": false,
            "resolved_at": null,
            "facility": "Plant A",
            "metric": "NOx"
        }"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.id, "ALERT-7");
        assert_eq!(alert.alert_type, "ThresholdExceeded");
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.facility.as_deref(), Some("Plant A"));
        assert!(alert.created_at().is_some());
    }

    #[test]
    fn alert_optional_fields_default() {
        let json = r#"{
            "alert_id": "ALERT-1",
            "type": "TrendAnalysis",
            "message": "Approaching threshold",
            "severity": "LOW",
            "timestamp": "2025-05-02T10:15:00.123456"
        }"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert!(!alert.resolved);
        assert!(alert.resolved_at.is_none());
        assert!(alert.created_at().is_some(), "Naive timestamps parse as UTC");
    }

    #[test]
    fn alert_serializes_with_wire_names() {
        let alert = Alert {
            id: "ALERT-2".into(),
            severity: Severity::Critical,
            alert_type: "Safety".into(),
            message: "Gas leak".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
            resolved: false,
            resolved_at: None,
            facility: None,
            metric: None,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["alert_id"], "ALERT-2");
        assert_eq!(json["type"], "Safety");
        assert_eq!(json["severity"], "CRITICAL");
    }
}
