use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::RiskLevel;

/// A compliance document owned by the backend. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: String,
    /// Publication date as sent by the backend (`YYYY-MM-DD`).
    pub published_at: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Document {
    /// Parsed publication date, `None` when the backend sent another format.
    pub fn published_date(&self) -> Option<NaiveDate> {
        let raw = self.published_at.get(..10).unwrap_or(&self.published_at);
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

/// Per-document analysis, derived on demand and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_id: String,
    /// 0–100.
    pub compliance_score: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub extracted_rules: Vec<String>,
    #[serde(default)]
    pub inconsistencies: Vec<String>,
    #[serde(default)]
    pub analyzed_at: Option<String>,
}

impl DocumentAnalysis {
    pub fn has_inconsistencies(&self) -> bool {
        !self.inconsistencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_deserializes_backend_shape() {
        let json = r#"{
            "id": "DOC-1A2B3C4D",
            "title": "Air Emissions Permit",
            "body": "Facilities shall report emissions quarterly.",
            "category": "Environmental",
            "published_at": "2025-03-14",
            "created_at": "2025-03-14T09:30:00"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, "DOC-1A2B3C4D");
        assert_eq!(doc.published_date(), NaiveDate::from_ymd_opt(2025, 3, 14));
    }

    #[test]
    fn published_date_accepts_datetime_prefix() {
        let doc = Document {
            id: "DOC-1".into(),
            title: "t".into(),
            body: "b".into(),
            category: "Safety".into(),
            published_at: "2024-12-01T00:00:00".into(),
            created_at: None,
        };
        assert_eq!(doc.published_date(), NaiveDate::from_ymd_opt(2024, 12, 1));
    }

    #[test]
    fn published_date_none_for_free_text() {
        let doc = Document {
            id: "DOC-2".into(),
            title: "t".into(),
            body: "b".into(),
            category: "Safety".into(),
            published_at: "last spring".into(),
            created_at: None,
        };
        assert!(doc.published_date().is_none());
    }

    #[test]
    fn analysis_keeps_rule_order() {
        let json = r#"{
            "document_id": "DOC-1",
            "compliance_score": 72.5,
            "risk_level": "MEDIUM",
            "extracted_rules": ["Report within 24h", "Keep logs 5 years"],
            "inconsistencies": []
        }"#;
        let analysis: DocumentAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(
            analysis.extracted_rules,
            vec!["Report within 24h".to_string(), "Keep logs 5 years".to_string()]
        );
        assert!(!analysis.has_inconsistencies());
    }
}
