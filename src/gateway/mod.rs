//! Remote operation gateway: typed wrappers around each backend call.
//!
//! One method per remote operation, one network request per call. No
//! retries, no caching: retry policy belongs to callers and the cache
//! layer owns derived collections. Parameters are validated locally
//! before any request is built; a rejected parameter set never reaches
//! the network.

pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod wire;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::models::{Alert, ComplianceTrends, Document, DocumentAnalysis};
use crate::upload::UploadFile;

pub use http::HttpGateway;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockGateway, Operation, OperationGate};

/// Largest synthetic/sample document batch accepted locally.
pub const MAX_DOCUMENT_COUNT: u32 = 500;
/// Largest synthetic operational-log batch accepted locally.
pub const MAX_LOG_COUNT: u32 = 5000;
/// Longest trends window accepted locally.
pub const MAX_TREND_DAYS: u32 = 365;

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Failure of a single remote operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure: unreachable host, reset connection, timeout.
    #[error("Network error: {0}")]
    Network(String),
    /// The backend answered with a non-success status or an unreadable body.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Rejected locally before any request was sent.
    #[error("Invalid request: {0}")]
    Validation(String),
}

impl GatewayError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// ═══════════════════════════════════════════════════════════
// Parameters and results
// ═══════════════════════════════════════════════════════════

/// Parameters of the bundled backend pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub generate_new_data: bool,
    pub document_count: u32,
    pub log_count: u32,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            generate_new_data: false,
            document_count: 10,
            log_count: 50,
        }
    }
}

/// Which checks the threshold alert generator should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdAlertOptions {
    pub analyze_operational_logs: bool,
    pub check_thresholds: bool,
    pub include_historical: bool,
}

impl Default for ThresholdAlertOptions {
    fn default() -> Self {
        Self {
            analyze_operational_logs: true,
            check_thresholds: true,
            include_historical: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub accepted: bool,
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticDataReport {
    pub documents_generated: u32,
    pub logs_generated: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeAllReport {
    pub documents_analyzed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertGenerationReport {
    pub alerts_generated: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub documents_generated: u32,
    pub documents_analyzed: u32,
    pub alerts_generated: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInitReport {
    pub documents_generated: u32,
    pub documents_analyzed: u32,
}

// ═══════════════════════════════════════════════════════════
// ComplianceGateway
// ═══════════════════════════════════════════════════════════

/// The backend contract the console relies on.
///
/// Object-safe so the orchestrator and cache can share one
/// `Arc<dyn ComplianceGateway>` regardless of transport.
pub trait ComplianceGateway: Send + Sync {
    fn upload_document<'a>(
        &'a self,
        file: &'a UploadFile,
    ) -> BoxFuture<'a, Result<UploadReceipt, GatewayError>>;

    fn generate_synthetic_data(
        &self,
        document_count: u32,
        log_count: u32,
    ) -> BoxFuture<'_, Result<SyntheticDataReport, GatewayError>>;

    fn analyze_document<'a>(
        &'a self,
        document_id: &'a str,
    ) -> BoxFuture<'a, Result<DocumentAnalysis, GatewayError>>;

    fn analyze_all_documents(&self) -> BoxFuture<'_, Result<AnalyzeAllReport, GatewayError>>;

    fn generate_alerts_from_logs(
        &self,
    ) -> BoxFuture<'_, Result<AlertGenerationReport, GatewayError>>;

    fn generate_threshold_alerts(
        &self,
        options: ThresholdAlertOptions,
    ) -> BoxFuture<'_, Result<Vec<Alert>, GatewayError>>;

    fn run_full_pipeline(
        &self,
        params: PipelineParams,
    ) -> BoxFuture<'_, Result<PipelineReport, GatewayError>>;

    fn initialize_samples(
        &self,
        document_count: u32,
    ) -> BoxFuture<'_, Result<SampleInitReport, GatewayError>>;

    fn fetch_documents(&self) -> BoxFuture<'_, Result<Vec<Document>, GatewayError>>;

    fn fetch_alerts(&self) -> BoxFuture<'_, Result<Vec<Alert>, GatewayError>>;

    fn fetch_compliance_trends(
        &self,
        days: u32,
    ) -> BoxFuture<'_, Result<ComplianceTrends, GatewayError>>;

    /// `true` when the backend reports itself healthy.
    fn health_check(&self) -> BoxFuture<'_, Result<bool, GatewayError>>;
}

// ── Local parameter validation ──────────────────────────

pub(crate) fn validate_document_count(count: u32) -> Result<(), GatewayError> {
    if count == 0 || count > MAX_DOCUMENT_COUNT {
        return Err(GatewayError::Validation(format!(
            "document_count must be between 1 and {MAX_DOCUMENT_COUNT}, got {count}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_log_count(count: u32) -> Result<(), GatewayError> {
    if count > MAX_LOG_COUNT {
        return Err(GatewayError::Validation(format!(
            "log_count must be at most {MAX_LOG_COUNT}, got {count}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_trend_days(days: u32) -> Result<(), GatewayError> {
    if days == 0 || days > MAX_TREND_DAYS {
        return Err(GatewayError::Validation(format!(
            "days must be between 1 and {MAX_TREND_DAYS}, got {days}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_document_id(document_id: &str) -> Result<(), GatewayError> {
    if document_id.trim().is_empty() {
        return Err(GatewayError::Validation("document_id is required".into()));
    }
    Ok(())
}

pub(crate) fn validate_upload_name(file: &UploadFile) -> Result<(), GatewayError> {
    if file.file_name().trim().is_empty() {
        return Err(GatewayError::Validation("upload file name is required".into()));
    }
    Ok(())
}

pub(crate) fn validate_pipeline_params(params: &PipelineParams) -> Result<(), GatewayError> {
    validate_document_count(params.document_count)?;
    validate_log_count(params.log_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_trait_is_object_safe() {
        fn _assert_gateway(_: &dyn ComplianceGateway) {}
    }

    #[test]
    fn document_count_bounds() {
        assert!(validate_document_count(0).is_err());
        assert!(validate_document_count(1).is_ok());
        assert!(validate_document_count(MAX_DOCUMENT_COUNT).is_ok());
        assert!(validate_document_count(MAX_DOCUMENT_COUNT + 1).is_err());
    }

    #[test]
    fn zero_logs_allowed() {
        assert!(validate_log_count(0).is_ok());
        assert!(validate_log_count(MAX_LOG_COUNT + 1).is_err());
    }

    #[test]
    fn trend_days_bounds() {
        assert!(validate_trend_days(0).is_err());
        assert!(validate_trend_days(30).is_ok());
        assert!(validate_trend_days(366).is_err());
    }

    #[test]
    fn blank_document_id_rejected() {
        let err = validate_document_id("   ").unwrap_err();
        assert!(err.is_validation());
        assert!(validate_document_id("DOC-1").is_ok());
    }

    #[test]
    fn pipeline_defaults_match_backend_defaults() {
        let params = PipelineParams::default();
        assert!(!params.generate_new_data);
        assert_eq!(params.document_count, 10);
        assert_eq!(params.log_count, 50);
        assert!(validate_pipeline_params(&params).is_ok());
    }

    #[test]
    fn gateway_error_display() {
        let err = GatewayError::Server {
            status: 500,
            message: "Error running pipeline".into(),
        };
        assert_eq!(err.to_string(), "Server error (500): Error running pipeline");
        assert!(!err.is_validation());
    }
}
