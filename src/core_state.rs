//! Console-wide shared state.
//!
//! `ConsoleState` wires the gateway, the query cache, the orchestrator and
//! the upload workflow together. It is the one object a front end holds;
//! workflow status is read through explicit queries, never shared flags.

use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::dashboard::DashboardSummary;
use crate::gateway::{
    self, ComplianceGateway, GatewayError, HttpGateway, PipelineParams, ThresholdAlertOptions,
};
use crate::models::{Alert, ComplianceTrends, Document, DocumentAnalysis};
use crate::query_cache::{CacheKey, QueryCache, RefetchReport, Snapshot};
use crate::ranking::{self, SeverityCounts};
use crate::upload::{UploadBanner, UploadFile, UploadWorkflow};
use crate::workflow::{Orchestrator, RunSummary, WorkflowError, WorkflowSpec, WorkflowState};

/// Errors from building the console state.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
}

// ═══════════════════════════════════════════════════════════
// ConsoleState
// ═══════════════════════════════════════════════════════════

pub struct ConsoleState {
    config: ConsoleConfig,
    gateway: Arc<dyn ComplianceGateway>,
    cache: Arc<QueryCache>,
    orchestrator: Arc<Orchestrator>,
    upload: UploadWorkflow,
}

impl ConsoleState {
    /// Build on an existing gateway. No network traffic.
    pub fn new(config: ConsoleConfig, gateway: Arc<dyn ComplianceGateway>) -> Self {
        let cache = Arc::new(QueryCache::new(gateway.clone(), config.trend_days));
        let orchestrator = Arc::new(Orchestrator::new(gateway.clone(), cache.clone()));
        let upload = UploadWorkflow::new(orchestrator.clone(), config.upload_success_ttl());
        Self {
            config,
            gateway,
            cache,
            orchestrator,
            upload,
        }
    }

    /// Build with the HTTP gateway described by `config`.
    pub fn from_config(config: ConsoleConfig) -> Result<Self, CoreError> {
        gateway::validate_trend_days(config.trend_days)?;
        let http = HttpGateway::from_config(&config)?;
        tracing::info!(api = http.base_url(), "Console state ready");
        Ok(Self::new(config, Arc::new(http)))
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    // ── Workflows ───────────────────────────────────────────

    pub async fn run_full_pipeline(&self, params: PipelineParams) -> Result<RunSummary, WorkflowError> {
        self.orchestrator
            .run_spec(WorkflowSpec::run_pipeline(params))
            .await
    }

    pub async fn process_documents(
        &self,
        document_count: u32,
        log_count: u32,
    ) -> Result<RunSummary, WorkflowError> {
        self.orchestrator
            .run_spec(WorkflowSpec::process_documents(document_count, log_count))
            .await
    }

    pub async fn generate_alerts(&self) -> Result<RunSummary, WorkflowError> {
        self.orchestrator
            .run_spec(WorkflowSpec::generate_alerts())
            .await
    }

    pub async fn initialize_samples(&self, document_count: u32) -> Result<RunSummary, WorkflowError> {
        self.orchestrator
            .run_spec(WorkflowSpec::initialize_samples(document_count))
            .await
    }

    pub async fn check_thresholds(
        &self,
        options: ThresholdAlertOptions,
    ) -> Result<RunSummary, WorkflowError> {
        self.orchestrator
            .run_spec(WorkflowSpec::check_thresholds(options))
            .await
    }

    pub async fn upload(&self, file: UploadFile) -> Result<RunSummary, WorkflowError> {
        self.upload.submit(file).await
    }

    pub fn upload_banner(&self) -> UploadBanner {
        self.upload.banner()
    }

    pub fn dismiss_upload_banner(&self) {
        self.upload.dismiss();
    }

    /// Analyze one document. The result goes to the caller and is not cached.
    pub async fn analyze_document(&self, document_id: &str) -> Result<DocumentAnalysis, GatewayError> {
        self.gateway.analyze_document(document_id).await
    }

    pub async fn health(&self) -> Result<bool, GatewayError> {
        self.gateway.health_check().await
    }

    // ── State queries ───────────────────────────────────────

    pub fn workflow_state(&self, name: &str) -> WorkflowState {
        self.orchestrator.state(name)
    }

    pub fn workflow_states(&self) -> Vec<(String, WorkflowState)> {
        self.orchestrator.registry().states()
    }

    pub fn documents(&self) -> Snapshot<Vec<Document>> {
        self.cache.documents()
    }

    pub fn trends(&self) -> Snapshot<ComplianceTrends> {
        self.cache.trends()
    }

    /// Cached alerts, most severe first.
    pub fn ranked_alerts(&self) -> Vec<Alert> {
        self.cache
            .alerts()
            .value
            .map(|alerts| ranking::rank_alerts(&alerts))
            .unwrap_or_default()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        self.cache
            .alerts()
            .value
            .map(|alerts| SeverityCounts::tally(&alerts))
            .unwrap_or_default()
    }

    pub fn dashboard_summary(&self) -> DashboardSummary {
        let documents = self.cache.documents().value;
        let alerts = self.cache.alerts().value;
        let trends = self.cache.trends().value;
        DashboardSummary::compute(
            documents.as_deref().map(Vec::as_slice),
            alerts.as_deref().map(Vec::as_slice),
            trends.as_deref(),
        )
    }

    // ── Cache control ───────────────────────────────────────

    /// Manual refresh: invalidate `keys`, then refetch them together.
    pub async fn refresh(&self, keys: &[CacheKey]) -> RefetchReport {
        self.cache.invalidate_all(keys);
        self.cache.refetch_all(keys).await
    }

    /// Initial load of every collection.
    pub async fn load_all(&self) -> RefetchReport {
        let report = self.cache.refetch_all(&CacheKey::ALL).await;
        if !report.all_succeeded() {
            tracing::warn!(failed = ?report.failed_keys(), "Initial load incomplete");
        }
        report
    }
}
