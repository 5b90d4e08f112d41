//! Response bodies as sent by the backend.
//!
//! Kept private to the gateway: callers only see the report types.

use serde::Deserialize;

use super::{
    AlertGenerationReport, AnalyzeAllReport, PipelineReport, SampleInitReport,
    SyntheticDataReport, UploadReceipt,
};

/// `POST /documents/upload`
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub document: Option<UploadedDocument>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadedDocument {
    pub id: String,
}

impl From<UploadResponse> for UploadReceipt {
    fn from(r: UploadResponse) -> Self {
        Self {
            accepted: r.success,
            document_id: r.document.map(|d| d.id),
        }
    }
}

/// `POST /processing/generate-data`, also nested in the pipeline response.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateDataResponse {
    #[serde(default)]
    pub documents_generated: u32,
    #[serde(default)]
    pub logs_generated: u32,
}

impl From<GenerateDataResponse> for SyntheticDataReport {
    fn from(r: GenerateDataResponse) -> Self {
        Self {
            documents_generated: r.documents_generated,
            logs_generated: r.logs_generated,
        }
    }
}

/// `POST /processing/analyze-documents` and `/processing/generate-alerts`.
#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    #[serde(default)]
    pub count: u32,
}

impl From<CountResponse> for AnalyzeAllReport {
    fn from(r: CountResponse) -> Self {
        Self {
            documents_analyzed: r.count,
        }
    }
}

impl From<CountResponse> for AlertGenerationReport {
    fn from(r: CountResponse) -> Self {
        Self {
            alerts_generated: r.count,
        }
    }
}

/// `POST /processing/initialize-samples`
#[derive(Debug, Deserialize)]
pub(crate) struct InitializeSamplesResponse {
    #[serde(default)]
    pub documents_generated: u32,
    #[serde(default)]
    pub documents_analyzed: u32,
}

impl From<InitializeSamplesResponse> for SampleInitReport {
    fn from(r: InitializeSamplesResponse) -> Self {
        Self {
            documents_generated: r.documents_generated,
            documents_analyzed: r.documents_analyzed,
        }
    }
}

/// `POST /processing/run-pipeline`
///
/// `data_generation` is null when the run did not generate new data.
#[derive(Debug, Deserialize)]
pub(crate) struct PipelineResponse {
    #[serde(default)]
    pub data_generation: Option<GenerateDataResponse>,
    #[serde(default)]
    pub documents_analyzed: u32,
    #[serde(default)]
    pub alerts_generated: u32,
}

impl From<PipelineResponse> for PipelineReport {
    fn from(r: PipelineResponse) -> Self {
        Self {
            documents_generated: r
                .data_generation
                .map(|g| g.documents_generated)
                .unwrap_or(0),
            documents_analyzed: r.documents_analyzed,
            alerts_generated: r.alerts_generated,
        }
    }
}

/// `GET /health`
#[derive(Debug, Deserialize)]
pub(crate) struct HealthResponse {
    pub status: String,
}

/// FastAPI error body. `detail` is a string for raised HTTP errors and a
/// list of objects for request validation failures.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
