//! The workflows the console exposes, by name.
//!
//! `run-pipeline` and `process-documents` overlap in effect but are kept
//! as separate definitions: one fused backend call versus two chained ones.

use crate::gateway::{PipelineParams, ThresholdAlertOptions};
use crate::query_cache::CacheKey;
use crate::upload::UploadFile;

use super::Step;

pub const RUN_PIPELINE: &str = "run-pipeline";
pub const PROCESS_DOCUMENTS: &str = "process-documents";
pub const GENERATE_ALERTS: &str = "generate-alerts";
pub const INITIALIZE_SAMPLES: &str = "initialize-samples";
pub const CHECK_THRESHOLDS: &str = "check-thresholds";
pub const UPLOAD: &str = "upload";

/// Sample batch size used by the "load sample data" action.
pub const SAMPLE_DOCUMENT_COUNT: u32 = 20;
/// Batch sizes used by "process all documents".
pub const PROCESS_DOCUMENT_COUNT: u32 = 10;
pub const PROCESS_LOG_COUNT: u32 = 50;

/// A named workflow ready to hand to the orchestrator.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    pub name: &'static str,
    pub steps: Vec<Step>,
    pub affected: &'static [CacheKey],
}

impl WorkflowSpec {
    pub fn run_pipeline(params: PipelineParams) -> Self {
        Self {
            name: RUN_PIPELINE,
            steps: vec![Step::RunFullPipeline(params)],
            affected: &[CacheKey::Documents, CacheKey::Alerts, CacheKey::Trends],
        }
    }

    /// Generate synthetic data, then analyze everything. Analysis must see
    /// the freshly generated documents, so the order is fixed.
    pub fn process_documents(document_count: u32, log_count: u32) -> Self {
        Self {
            name: PROCESS_DOCUMENTS,
            steps: vec![
                Step::GenerateSyntheticData {
                    document_count,
                    log_count,
                },
                Step::AnalyzeAllDocuments,
            ],
            affected: &[CacheKey::Documents, CacheKey::Trends],
        }
    }

    pub fn generate_alerts() -> Self {
        Self {
            name: GENERATE_ALERTS,
            steps: vec![Step::GenerateAlertsFromLogs],
            affected: &[CacheKey::Alerts],
        }
    }

    pub fn initialize_samples(document_count: u32) -> Self {
        Self {
            name: INITIALIZE_SAMPLES,
            steps: vec![Step::InitializeSamples { document_count }],
            affected: &[CacheKey::Documents, CacheKey::Trends],
        }
    }

    pub fn check_thresholds(options: ThresholdAlertOptions) -> Self {
        Self {
            name: CHECK_THRESHOLDS,
            steps: vec![Step::GenerateThresholdAlerts(options)],
            affected: &[CacheKey::Alerts],
        }
    }

    pub fn upload(file: UploadFile) -> Self {
        Self {
            name: UPLOAD,
            steps: vec![Step::UploadDocument(file)],
            affected: &[CacheKey::Documents, CacheKey::Trends, CacheKey::Alerts],
        }
    }
}
