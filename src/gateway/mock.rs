//! Scriptable in-memory gateway.
//!
//! Records every call that would have reached the network, returns
//! configured payloads, injects failures per operation, and can hold an
//! operation open until a test releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::sync::Notify;

use super::{
    validate_document_count, validate_document_id, validate_log_count,
    validate_pipeline_params, validate_trend_days, validate_upload_name, AlertGenerationReport,
    AnalyzeAllReport, ComplianceGateway, GatewayError, PipelineParams, PipelineReport,
    SampleInitReport, SyntheticDataReport, ThresholdAlertOptions, UploadReceipt,
};
use crate::models::{Alert, ComplianceTrends, Document, DocumentAnalysis, RiskLevel};
use crate::upload::UploadFile;

/// Remote operations, as seen by the mock's call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UploadDocument,
    GenerateSyntheticData,
    AnalyzeDocument,
    AnalyzeAllDocuments,
    GenerateAlertsFromLogs,
    GenerateThresholdAlerts,
    RunFullPipeline,
    InitializeSamples,
    FetchDocuments,
    FetchAlerts,
    FetchComplianceTrends,
    HealthCheck,
}

impl Operation {
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::FetchDocuments | Self::FetchAlerts | Self::FetchComplianceTrends
        )
    }
}

/// Holds an operation open: the mock signals `entered` and waits for
/// `release` before answering.
#[derive(Default)]
pub struct OperationGate {
    entered: Notify,
    release: Notify,
}

impl OperationGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolves once the gated operation has been called.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated operation answer.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

struct MockState {
    calls: Vec<Operation>,
    failures: HashMap<Operation, GatewayError>,
    gates: HashMap<Operation, Arc<OperationGate>>,
    documents: Vec<Document>,
    alerts: Vec<Alert>,
    trends: ComplianceTrends,
    threshold_alerts: Vec<Alert>,
    upload: UploadReceipt,
    synthetic: SyntheticDataReport,
    analyze_all: AnalyzeAllReport,
    alert_generation: AlertGenerationReport,
    pipeline: PipelineReport,
    samples: SampleInitReport,
    analysis: Option<DocumentAnalysis>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failures: HashMap::new(),
            gates: HashMap::new(),
            documents: Vec::new(),
            alerts: Vec::new(),
            trends: ComplianceTrends::default(),
            threshold_alerts: Vec::new(),
            upload: UploadReceipt {
                accepted: true,
                document_id: Some("DOC-MOCK0001".into()),
            },
            synthetic: SyntheticDataReport::default(),
            analyze_all: AnalyzeAllReport::default(),
            alert_generation: AlertGenerationReport::default(),
            pipeline: PipelineReport::default(),
            samples: SampleInitReport::default(),
            analysis: None,
        }
    }
}

/// In-memory `ComplianceGateway` for tests and offline runs.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Builders ─────────────────────────────────────────

    pub fn with_documents(self, documents: Vec<Document>) -> Self {
        self.set_documents(documents);
        self
    }

    pub fn with_alerts(self, alerts: Vec<Alert>) -> Self {
        self.set_alerts(alerts);
        self
    }

    pub fn with_trends(self, trends: ComplianceTrends) -> Self {
        self.edit(|s| s.trends = trends);
        self
    }

    pub fn with_threshold_alerts(self, alerts: Vec<Alert>) -> Self {
        self.edit(|s| s.threshold_alerts = alerts);
        self
    }

    pub fn with_upload_receipt(self, receipt: UploadReceipt) -> Self {
        self.edit(|s| s.upload = receipt);
        self
    }

    pub fn with_synthetic_report(self, report: SyntheticDataReport) -> Self {
        self.edit(|s| s.synthetic = report);
        self
    }

    pub fn with_analyzed_count(self, documents_analyzed: u32) -> Self {
        self.edit(|s| s.analyze_all = AnalyzeAllReport { documents_analyzed });
        self
    }

    pub fn with_alerts_generated(self, alerts_generated: u32) -> Self {
        self.edit(|s| s.alert_generation = AlertGenerationReport { alerts_generated });
        self
    }

    pub fn with_pipeline_report(self, report: PipelineReport) -> Self {
        self.edit(|s| s.pipeline = report);
        self
    }

    pub fn with_sample_report(self, report: SampleInitReport) -> Self {
        self.edit(|s| s.samples = report);
        self
    }

    pub fn with_analysis(self, analysis: DocumentAnalysis) -> Self {
        self.edit(|s| s.analysis = Some(analysis));
        self
    }

    pub fn with_failure(self, op: Operation, error: GatewayError) -> Self {
        self.fail(op, error);
        self
    }

    pub fn with_gate(self, op: Operation, gate: Arc<OperationGate>) -> Self {
        self.edit(|s| {
            s.gates.insert(op, gate);
        });
        self
    }

    // ── Runtime scripting ────────────────────────────────

    /// Replace the backend's documents (as if another client wrote them).
    pub fn set_documents(&self, documents: Vec<Document>) {
        self.edit(|s| s.documents = documents);
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        self.edit(|s| s.alerts = alerts);
    }

    pub fn fail(&self, op: Operation, error: GatewayError) {
        self.edit(|s| {
            s.failures.insert(op, error);
        });
    }

    pub fn clear_failure(&self, op: Operation) {
        self.edit(|s| {
            s.failures.remove(&op);
        });
    }

    // ── Inspection ───────────────────────────────────────

    /// Every call that reached the mock, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    /// Total calls of any kind.
    pub fn network_calls(&self) -> usize {
        self.calls().len()
    }

    // ── Internal ─────────────────────────────────────────

    fn edit<F: FnOnce(&mut MockState)>(&self, f: F) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut *state);
        }
    }

    fn read<T, F: FnOnce(&MockState) -> T>(&self, f: F) -> Result<T, GatewayError> {
        self.state
            .lock()
            .map(|s| f(&*s))
            .map_err(|_| GatewayError::Network("mock state poisoned".into()))
    }

    /// Record the call, wait on its gate if any, then apply scripted failure.
    async fn enter(&self, op: Operation) -> Result<(), GatewayError> {
        let gate = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| GatewayError::Network("mock state poisoned".into()))?;
            state.calls.push(op);
            state.gates.get(&op).cloned()
        };

        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        match self.read(|s| s.failures.get(&op).cloned())? {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl ComplianceGateway for MockGateway {
    fn upload_document<'a>(
        &'a self,
        file: &'a UploadFile,
    ) -> BoxFuture<'a, Result<UploadReceipt, GatewayError>> {
        Box::pin(async move {
            validate_upload_name(file)?;
            self.enter(Operation::UploadDocument).await?;
            self.read(|s| s.upload.clone())
        })
    }

    fn generate_synthetic_data(
        &self,
        document_count: u32,
        log_count: u32,
    ) -> BoxFuture<'_, Result<SyntheticDataReport, GatewayError>> {
        Box::pin(async move {
            validate_document_count(document_count)?;
            validate_log_count(log_count)?;
            self.enter(Operation::GenerateSyntheticData).await?;
            self.read(|s| s.synthetic)
        })
    }

    fn analyze_document<'a>(
        &'a self,
        document_id: &'a str,
    ) -> BoxFuture<'a, Result<DocumentAnalysis, GatewayError>> {
        Box::pin(async move {
            validate_document_id(document_id)?;
            self.enter(Operation::AnalyzeDocument).await?;
            let scripted = self.read(|s| s.analysis.clone())?;
            Ok(scripted.unwrap_or_else(|| DocumentAnalysis {
                document_id: document_id.to_string(),
                compliance_score: 100.0,
                risk_level: RiskLevel::Low,
                extracted_rules: Vec::new(),
                inconsistencies: Vec::new(),
                analyzed_at: None,
            }))
        })
    }

    fn analyze_all_documents(&self) -> BoxFuture<'_, Result<AnalyzeAllReport, GatewayError>> {
        Box::pin(async move {
            self.enter(Operation::AnalyzeAllDocuments).await?;
            self.read(|s| s.analyze_all)
        })
    }

    fn generate_alerts_from_logs(
        &self,
    ) -> BoxFuture<'_, Result<AlertGenerationReport, GatewayError>> {
        Box::pin(async move {
            self.enter(Operation::GenerateAlertsFromLogs).await?;
            self.read(|s| s.alert_generation)
        })
    }

    fn generate_threshold_alerts(
        &self,
        _options: ThresholdAlertOptions,
    ) -> BoxFuture<'_, Result<Vec<Alert>, GatewayError>> {
        Box::pin(async move {
            self.enter(Operation::GenerateThresholdAlerts).await?;
            self.read(|s| s.threshold_alerts.clone())
        })
    }

    fn run_full_pipeline(
        &self,
        params: PipelineParams,
    ) -> BoxFuture<'_, Result<PipelineReport, GatewayError>> {
        Box::pin(async move {
            validate_pipeline_params(&params)?;
            self.enter(Operation::RunFullPipeline).await?;
            self.read(|s| s.pipeline)
        })
    }

    fn initialize_samples(
        &self,
        document_count: u32,
    ) -> BoxFuture<'_, Result<SampleInitReport, GatewayError>> {
        Box::pin(async move {
            validate_document_count(document_count)?;
            self.enter(Operation::InitializeSamples).await?;
            self.read(|s| s.samples)
        })
    }

    fn fetch_documents(&self) -> BoxFuture<'_, Result<Vec<Document>, GatewayError>> {
        Box::pin(async move {
            self.enter(Operation::FetchDocuments).await?;
            self.read(|s| s.documents.clone())
        })
    }

    fn fetch_alerts(&self) -> BoxFuture<'_, Result<Vec<Alert>, GatewayError>> {
        Box::pin(async move {
            self.enter(Operation::FetchAlerts).await?;
            self.read(|s| s.alerts.clone())
        })
    }

    fn fetch_compliance_trends(
        &self,
        days: u32,
    ) -> BoxFuture<'_, Result<ComplianceTrends, GatewayError>> {
        Box::pin(async move {
            validate_trend_days(days)?;
            self.enter(Operation::FetchComplianceTrends).await?;
            self.read(|s| s.trends.clone())
        })
    }

    fn health_check(&self) -> BoxFuture<'_, Result<bool, GatewayError>> {
        Box::pin(async move {
            self.enter(Operation::HealthCheck).await?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_scripted_payloads() {
        let mock = MockGateway::new().with_pipeline_report(PipelineReport {
            documents_generated: 4,
            documents_analyzed: 8,
            alerts_generated: 1,
        });

        let report = mock.run_full_pipeline(PipelineParams::default()).await.unwrap();
        assert_eq!(report.documents_analyzed, 8);
        assert_eq!(mock.calls(), vec![Operation::RunFullPipeline]);
    }

    #[tokio::test]
    async fn mock_failure_is_per_operation() {
        let mock = MockGateway::new().with_failure(
            Operation::FetchAlerts,
            GatewayError::Network("connection reset".into()),
        );

        assert!(mock.fetch_alerts().await.is_err());
        assert!(mock.fetch_documents().await.is_ok());

        mock.clear_failure(Operation::FetchAlerts);
        assert!(mock.fetch_alerts().await.is_ok());
        assert_eq!(mock.call_count(Operation::FetchAlerts), 2);
    }

    #[tokio::test]
    async fn mock_validation_records_no_call() {
        let mock = MockGateway::new();
        assert!(mock.generate_synthetic_data(0, 10).await.is_err());
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn gate_holds_operation_until_released() {
        let gate = OperationGate::new();
        let mock = MockGateway::new().with_gate(Operation::HealthCheck, gate.clone());

        let call = mock.health_check();
        tokio::pin!(call);

        tokio::select! {
            _ = &mut call => panic!("gated call answered before release"),
            _ = gate.entered() => {}
        }

        gate.release();
        assert!(call.await.unwrap());
    }

    #[test]
    fn fetch_operations_flagged() {
        assert!(Operation::FetchDocuments.is_fetch());
        assert!(Operation::FetchComplianceTrends.is_fetch());
        assert!(!Operation::RunFullPipeline.is_fetch());
    }
}
