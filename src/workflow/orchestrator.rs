//! Runs workflows: exclusive per name, strictly sequential steps, and a
//! cache refresh of the affected keys on every settled run.

use std::sync::Arc;

use crate::gateway::ComplianceGateway;
use crate::query_cache::{CacheKey, QueryCache};

use super::{
    RunGuard, RunSummary, Step, WorkflowError, WorkflowRegistry, WorkflowSpec, WorkflowState,
};

pub struct Orchestrator {
    gateway: Arc<dyn ComplianceGateway>,
    cache: Arc<QueryCache>,
    registry: WorkflowRegistry,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn ComplianceGateway>, cache: Arc<QueryCache>) -> Self {
        Self {
            gateway,
            cache,
            registry: WorkflowRegistry::new(),
        }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn state(&self, name: &str) -> WorkflowState {
        self.registry.state(name)
    }

    pub async fn run_spec(&self, spec: WorkflowSpec) -> Result<RunSummary, WorkflowError> {
        self.run(spec.name, spec.steps, spec.affected).await
    }

    /// Run `steps` in order as workflow `name`, then refresh `affected`.
    ///
    /// - Parameters of every step are checked first; a rejected set returns
    ///   `Validation` without touching run state or the gateway.
    /// - A run of the same name already in flight returns `Busy` at once.
    /// - The first failing step aborts the rest. The affected keys are
    ///   still invalidated and refetched, since the backend may have applied
    ///   part of the work.
    /// - Run state settles only after the refetch, and the run slot is
    ///   released on every path.
    ///
    /// No retries and no timeouts are added here.
    pub async fn run(
        &self,
        name: &str,
        steps: Vec<Step>,
        affected: &[CacheKey],
    ) -> Result<RunSummary, WorkflowError> {
        let guard = self.begin(name, &steps)?;
        self.execute(guard, steps, affected).await
    }

    /// Check every step and claim the run slot for `name`, without any
    /// gateway call. Pair with [`execute`](Self::execute).
    pub fn begin(&self, name: &str, steps: &[Step]) -> Result<RunGuard<'_>, WorkflowError> {
        for step in steps {
            step.validate()
                .map_err(|e| WorkflowError::Validation(format!("{}: {e}", step.kind())))?;
        }
        self.registry.begin(name)
    }

    /// Run `steps` under an already claimed slot, refresh `affected`, then
    /// settle the run.
    pub async fn execute(
        &self,
        guard: RunGuard<'_>,
        steps: Vec<Step>,
        affected: &[CacheKey],
    ) -> Result<RunSummary, WorkflowError> {
        let name = guard.name().to_string();
        tracing::info!(
            workflow = %name,
            run_id = %guard.run_id(),
            steps = steps.len(),
            "Workflow started"
        );

        let mut summary = RunSummary::default();
        let mut failure = None;

        for step in &steps {
            match step.execute(self.gateway.as_ref()).await {
                Ok(contribution) => {
                    tracing::debug!(workflow = %name, step = %step.kind(), "Step completed");
                    summary.absorb(contribution);
                }
                Err(source) => {
                    tracing::warn!(
                        workflow = %name,
                        step = %step.kind(),
                        completed = summary.steps_completed,
                        error = %source,
                        "Step failed, skipping remaining steps"
                    );
                    failure = Some(WorkflowError::Step {
                        step: step.kind(),
                        source,
                    });
                    break;
                }
            }
        }

        self.refresh(&name, affected).await;

        match failure {
            None => {
                tracing::info!(
                    workflow = %name,
                    documents_generated = summary.documents_generated,
                    documents_analyzed = summary.documents_analyzed,
                    alerts_generated = summary.alerts_generated,
                    "Workflow succeeded"
                );
                guard.succeed(summary.clone());
                Ok(summary)
            }
            Some(error) => {
                guard.fail(error.clone());
                Err(error)
            }
        }
    }

    async fn refresh(&self, name: &str, affected: &[CacheKey]) {
        if affected.is_empty() {
            return;
        }
        self.cache.invalidate_all(affected);
        let report = self.cache.refetch_all(affected).await;
        if !report.all_succeeded() {
            // Stale keys stay visible through their freshness flag.
            tracing::warn!(
                workflow = %name,
                failed = ?report.failed_keys(),
                "Cache refresh after workflow left keys stale"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MockGateway, Operation, OperationGate, PipelineParams, PipelineReport};

    const ALL_KEYS: &[CacheKey] = &[CacheKey::Documents, CacheKey::Alerts, CacheKey::Trends];

    fn orchestrator_over(mock: Arc<MockGateway>) -> Orchestrator {
        let gateway: Arc<dyn ComplianceGateway> = mock;
        let cache = Arc::new(QueryCache::new(gateway.clone(), 30));
        Orchestrator::new(gateway, cache)
    }

    fn pipeline(generate_new_data: bool) -> Vec<Step> {
        vec![Step::RunFullPipeline(PipelineParams {
            generate_new_data,
            document_count: 10,
            log_count: 50,
        })]
    }

    fn process_steps() -> Vec<Step> {
        vec![
            Step::GenerateSyntheticData {
                document_count: 10,
                log_count: 50,
            },
            Step::AnalyzeAllDocuments,
        ]
    }

    #[tokio::test]
    async fn full_pipeline_run_end_to_end() {
        let mock = Arc::new(MockGateway::new().with_pipeline_report(PipelineReport {
            documents_generated: 10,
            documents_analyzed: 50,
            alerts_generated: 3,
        }));
        let orch = orchestrator_over(mock.clone());

        let summary = orch.run("run-pipeline", pipeline(true), ALL_KEYS).await.unwrap();

        assert_eq!(summary.documents_generated, 10);
        assert_eq!(summary.documents_analyzed, 50);
        assert_eq!(summary.alerts_generated, 3);
        match orch.state("run-pipeline") {
            WorkflowState::Succeeded { summary: recorded, .. } => assert_eq!(recorded, summary),
            other => panic!("Expected Succeeded, got: {other:?}"),
        }
        for key in ALL_KEYS {
            assert!(orch.cache().is_fresh(*key), "{key} should be fresh");
        }
        assert_eq!(mock.call_count(Operation::RunFullPipeline), 1);
        assert_eq!(mock.call_count(Operation::FetchDocuments), 1);
        assert_eq!(mock.call_count(Operation::FetchAlerts), 1);
        assert_eq!(mock.call_count(Operation::FetchComplianceTrends), 1);
    }

    #[tokio::test]
    async fn overlapping_run_same_name_is_busy_without_gateway_calls() {
        let gate = OperationGate::new();
        let mock = Arc::new(MockGateway::new().with_gate(Operation::RunFullPipeline, gate.clone()));
        let orch = orchestrator_over(mock.clone());

        let first = orch.run("run-pipeline", pipeline(false), ALL_KEYS);
        tokio::pin!(first);
        tokio::select! {
            _ = &mut first => panic!("first run settled before release"),
            _ = gate.entered() => {}
        }
        assert!(orch.state("run-pipeline").is_running());

        let second = orch.run("run-pipeline", pipeline(false), ALL_KEYS).await;
        assert_eq!(second, Err(WorkflowError::Busy("run-pipeline".into())));
        assert_eq!(mock.network_calls(), 1, "Busy run must not reach the gateway");

        gate.release();
        assert!(first.await.is_ok());
        assert_eq!(mock.call_count(Operation::RunFullPipeline), 1);
    }

    #[tokio::test]
    async fn distinct_workflows_overlap() {
        let gate = OperationGate::new();
        let mock = Arc::new(MockGateway::new().with_gate(Operation::RunFullPipeline, gate.clone()));
        let orch = orchestrator_over(mock.clone());

        let pipeline_run = orch.run("run-pipeline", pipeline(false), ALL_KEYS);
        tokio::pin!(pipeline_run);
        tokio::select! {
            _ = &mut pipeline_run => panic!("pipeline settled before release"),
            _ = gate.entered() => {}
        }

        let alerts = orch
            .run("generate-alerts", vec![Step::GenerateAlertsFromLogs], &[CacheKey::Alerts])
            .await;
        assert!(alerts.is_ok());

        gate.release();
        assert!(pipeline_run.await.is_ok());
    }

    #[tokio::test]
    async fn partial_failure_still_refreshes_affected_keys_once() {
        let mock = Arc::new(MockGateway::new().with_failure(
            Operation::AnalyzeAllDocuments,
            GatewayError::Server {
                status: 500,
                message: "analysis backend offline".into(),
            },
        ));
        let orch = orchestrator_over(mock.clone());
        let affected = [CacheKey::Documents, CacheKey::Trends];

        let err = orch
            .run("process-documents", process_steps(), &affected)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Step {
                step: crate::workflow::StepKind::AnalyzeAllDocuments,
                ..
            }
        ));
        assert_eq!(mock.call_count(Operation::FetchDocuments), 1);
        assert_eq!(mock.call_count(Operation::FetchComplianceTrends), 1);
        assert_eq!(mock.call_count(Operation::FetchAlerts), 0, "Unaffected key untouched");
        assert!(orch.cache().is_fresh(CacheKey::Documents));
        match orch.state("process-documents") {
            WorkflowState::Failed { error, .. } => assert_eq!(error, err),
            other => panic!("Expected Failed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_step_failure_skips_rest_and_still_refreshes() {
        let mock = Arc::new(MockGateway::new().with_failure(
            Operation::GenerateSyntheticData,
            GatewayError::Network("connection reset".into()),
        ));
        let orch = orchestrator_over(mock.clone());

        let result = orch
            .run("process-documents", process_steps(), &[CacheKey::Documents])
            .await;

        assert!(result.is_err());
        assert_eq!(mock.call_count(Operation::AnalyzeAllDocuments), 0);
        assert_eq!(mock.call_count(Operation::FetchDocuments), 1);
    }

    #[tokio::test]
    async fn steps_run_in_order_before_refresh() {
        let mock = Arc::new(MockGateway::new());
        let orch = orchestrator_over(mock.clone());

        orch.run("process-documents", process_steps(), &[CacheKey::Documents])
            .await
            .unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                Operation::GenerateSyntheticData,
                Operation::AnalyzeAllDocuments,
                Operation::FetchDocuments,
            ]
        );
    }

    #[tokio::test]
    async fn invalid_parameters_rejected_before_any_call() {
        let mock = Arc::new(MockGateway::new());
        let orch = orchestrator_over(mock.clone());

        let err = orch
            .run(
                "initialize-samples",
                vec![Step::InitializeSamples { document_count: 0 }],
                &[CacheKey::Documents],
            )
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(mock.network_calls(), 0);
        assert_eq!(orch.state("initialize-samples"), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_fail_successful_run() {
        let mock = Arc::new(MockGateway::new().with_failure(
            Operation::FetchAlerts,
            GatewayError::Network("timed out".into()),
        ));
        let orch = orchestrator_over(mock.clone());

        let result = orch
            .run("generate-alerts", vec![Step::GenerateAlertsFromLogs], &[CacheKey::Alerts])
            .await;

        assert!(result.is_ok());
        assert!(!orch.cache().is_fresh(CacheKey::Alerts));
        assert_eq!(orch.state("generate-alerts").label(), "succeeded");
    }

    #[tokio::test]
    async fn slot_released_after_failure() {
        let mock = Arc::new(MockGateway::new().with_failure(
            Operation::GenerateAlertsFromLogs,
            GatewayError::Network("connection refused".into()),
        ));
        let orch = orchestrator_over(mock.clone());
        let steps = || vec![Step::GenerateAlertsFromLogs];

        assert!(orch.run("generate-alerts", steps(), &[]).await.is_err());
        mock.clear_failure(Operation::GenerateAlertsFromLogs);
        assert!(orch.run("generate-alerts", steps(), &[]).await.is_ok());
        assert_eq!(mock.call_count(Operation::GenerateAlertsFromLogs), 2);
    }

    #[tokio::test]
    async fn dropped_run_is_marked_interrupted() {
        let gate = OperationGate::new();
        let mock = Arc::new(MockGateway::new().with_gate(Operation::RunFullPipeline, gate.clone()));
        let orch = orchestrator_over(mock.clone());

        {
            let run = orch.run("run-pipeline", pipeline(false), ALL_KEYS);
            tokio::pin!(run);
            tokio::select! {
                _ = &mut run => panic!("run settled before release"),
                _ = gate.entered() => {}
            }
        }

        match orch.state("run-pipeline") {
            WorkflowState::Failed { error, .. } => assert_eq!(error, WorkflowError::Interrupted),
            other => panic!("Expected Failed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_dropped_during_refresh_leaves_no_loading_key() {
        let gate = OperationGate::new();
        let mock = Arc::new(MockGateway::new().with_gate(Operation::FetchAlerts, gate.clone()));
        let orch = orchestrator_over(mock.clone());

        {
            let run = orch.run("generate-alerts", vec![Step::GenerateAlertsFromLogs], &[CacheKey::Alerts]);
            tokio::pin!(run);
            tokio::select! {
                _ = &mut run => panic!("run settled before refresh was released"),
                _ = gate.entered() => {}
            }
            assert!(orch.cache().get(CacheKey::Alerts).is_loading());
        }

        assert_eq!(orch.state("generate-alerts").label(), "failed");
        assert!(!orch.cache().get(CacheKey::Alerts).is_loading());
    }
}
