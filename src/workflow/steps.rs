//! The remote operations a workflow can chain, and the summary they feed.

use serde::Serialize;

use crate::gateway::{
    self, ComplianceGateway, GatewayError, PipelineParams, ThresholdAlertOptions,
};
use crate::upload::UploadFile;

/// Which remote operation a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    UploadDocument,
    GenerateSyntheticData,
    AnalyzeAllDocuments,
    GenerateAlertsFromLogs,
    GenerateThresholdAlerts,
    RunFullPipeline,
    InitializeSamples,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadDocument => "upload-document",
            Self::GenerateSyntheticData => "generate-synthetic-data",
            Self::AnalyzeAllDocuments => "analyze-all-documents",
            Self::GenerateAlertsFromLogs => "generate-alerts-from-logs",
            Self::GenerateThresholdAlerts => "generate-threshold-alerts",
            Self::RunFullPipeline => "run-full-pipeline",
            Self::InitializeSamples => "initialize-samples",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gateway call inside a workflow.
#[derive(Debug, Clone)]
pub enum Step {
    UploadDocument(UploadFile),
    GenerateSyntheticData { document_count: u32, log_count: u32 },
    AnalyzeAllDocuments,
    GenerateAlertsFromLogs,
    GenerateThresholdAlerts(ThresholdAlertOptions),
    RunFullPipeline(PipelineParams),
    InitializeSamples { document_count: u32 },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::UploadDocument(_) => StepKind::UploadDocument,
            Self::GenerateSyntheticData { .. } => StepKind::GenerateSyntheticData,
            Self::AnalyzeAllDocuments => StepKind::AnalyzeAllDocuments,
            Self::GenerateAlertsFromLogs => StepKind::GenerateAlertsFromLogs,
            Self::GenerateThresholdAlerts(_) => StepKind::GenerateThresholdAlerts,
            Self::RunFullPipeline(_) => StepKind::RunFullPipeline,
            Self::InitializeSamples { .. } => StepKind::InitializeSamples,
        }
    }

    /// Local parameter checks, run for every step before the first call.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match self {
            Self::UploadDocument(file) => gateway::validate_upload_name(file),
            Self::GenerateSyntheticData {
                document_count,
                log_count,
            } => {
                gateway::validate_document_count(*document_count)?;
                gateway::validate_log_count(*log_count)
            }
            Self::RunFullPipeline(params) => gateway::validate_pipeline_params(params),
            Self::InitializeSamples { document_count } => {
                gateway::validate_document_count(*document_count)
            }
            Self::AnalyzeAllDocuments
            | Self::GenerateAlertsFromLogs
            | Self::GenerateThresholdAlerts(_) => Ok(()),
        }
    }

    /// Perform the call and return this step's contribution to the summary.
    pub async fn execute(&self, gateway: &dyn ComplianceGateway) -> Result<RunSummary, GatewayError> {
        let mut out = RunSummary {
            steps_completed: 1,
            ..Default::default()
        };

        match self {
            Self::UploadDocument(file) => {
                let receipt = gateway.upload_document(file).await?;
                if !receipt.accepted {
                    return Err(GatewayError::Server {
                        status: 200,
                        message: format!("Upload of '{}' was not accepted", file.file_name()),
                    });
                }
                out.documents_uploaded = 1;
                out.uploaded_document_id = receipt.document_id;
            }
            Self::GenerateSyntheticData {
                document_count,
                log_count,
            } => {
                let report = gateway
                    .generate_synthetic_data(*document_count, *log_count)
                    .await?;
                out.documents_generated = report.documents_generated;
                out.logs_generated = report.logs_generated;
            }
            Self::AnalyzeAllDocuments => {
                out.documents_analyzed = gateway.analyze_all_documents().await?.documents_analyzed;
            }
            Self::GenerateAlertsFromLogs => {
                out.alerts_generated = gateway.generate_alerts_from_logs().await?.alerts_generated;
            }
            Self::GenerateThresholdAlerts(options) => {
                let alerts = gateway.generate_threshold_alerts(*options).await?;
                out.alerts_generated = u32::try_from(alerts.len()).unwrap_or(u32::MAX);
            }
            Self::RunFullPipeline(params) => {
                let report = gateway.run_full_pipeline(*params).await?;
                out.documents_generated = report.documents_generated;
                out.documents_analyzed = report.documents_analyzed;
                out.alerts_generated = report.alerts_generated;
            }
            Self::InitializeSamples { document_count } => {
                let report = gateway.initialize_samples(*document_count).await?;
                out.documents_generated = report.documents_generated;
                out.documents_analyzed = report.documents_analyzed;
            }
        }

        Ok(out)
    }
}

/// Counts aggregated over the completed steps of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub documents_uploaded: u32,
    pub documents_generated: u32,
    pub logs_generated: u32,
    pub documents_analyzed: u32,
    pub alerts_generated: u32,
    pub steps_completed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_document_id: Option<String>,
}

impl RunSummary {
    /// Fold one step's contribution into the running total.
    pub fn absorb(&mut self, step: RunSummary) {
        self.documents_uploaded = self.documents_uploaded.saturating_add(step.documents_uploaded);
        self.documents_generated = self.documents_generated.saturating_add(step.documents_generated);
        self.logs_generated = self.logs_generated.saturating_add(step.logs_generated);
        self.documents_analyzed = self.documents_analyzed.saturating_add(step.documents_analyzed);
        self.alerts_generated = self.alerts_generated.saturating_add(step.alerts_generated);
        self.steps_completed = self.steps_completed.saturating_add(step.steps_completed);
        if step.uploaded_document_id.is_some() {
            self.uploaded_document_id = step.uploaded_document_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        MockGateway, Operation, PipelineReport, SyntheticDataReport, UploadReceipt,
    };

    #[test]
    fn absorb_adds_counts() {
        let mut total = RunSummary::default();
        total.absorb(RunSummary {
            documents_generated: 10,
            logs_generated: 50,
            steps_completed: 1,
            ..Default::default()
        });
        total.absorb(RunSummary {
            documents_analyzed: 10,
            steps_completed: 1,
            ..Default::default()
        });

        assert_eq!(total.documents_generated, 10);
        assert_eq!(total.documents_analyzed, 10);
        assert_eq!(total.steps_completed, 2);
    }

    #[test]
    fn validate_rejects_out_of_range_counts() {
        assert!(Step::GenerateSyntheticData {
            document_count: 0,
            log_count: 50
        }
        .validate()
        .is_err());
        assert!(Step::InitializeSamples { document_count: 501 }.validate().is_err());
        assert!(Step::RunFullPipeline(PipelineParams::default()).validate().is_ok());
        assert!(Step::AnalyzeAllDocuments.validate().is_ok());
    }

    #[tokio::test]
    async fn pipeline_step_copies_report() {
        let mock = MockGateway::new().with_pipeline_report(PipelineReport {
            documents_generated: 10,
            documents_analyzed: 50,
            alerts_generated: 3,
        });

        let out = Step::RunFullPipeline(PipelineParams::default())
            .execute(&mock)
            .await
            .unwrap();

        assert_eq!(out.documents_generated, 10);
        assert_eq!(out.documents_analyzed, 50);
        assert_eq!(out.alerts_generated, 3);
        assert_eq!(out.steps_completed, 1);
    }

    #[tokio::test]
    async fn synthetic_then_analyze_summaries() {
        let mock = MockGateway::new()
            .with_synthetic_report(SyntheticDataReport {
                documents_generated: 10,
                logs_generated: 50,
            })
            .with_analyzed_count(12);

        let first = Step::GenerateSyntheticData {
            document_count: 10,
            log_count: 50,
        }
        .execute(&mock)
        .await
        .unwrap();
        let second = Step::AnalyzeAllDocuments.execute(&mock).await.unwrap();

        assert_eq!(first.logs_generated, 50);
        assert_eq!(second.documents_analyzed, 12);
        assert_eq!(
            mock.calls(),
            vec![Operation::GenerateSyntheticData, Operation::AnalyzeAllDocuments]
        );
    }

    #[tokio::test]
    async fn rejected_upload_is_a_server_error() {
        let mock = MockGateway::new().with_upload_receipt(UploadReceipt {
            accepted: false,
            document_id: None,
        });
        let file = UploadFile::new("notes.txt", Some("text/plain"), b"shall comply".to_vec());

        let err = Step::UploadDocument(file).execute(&mock).await.unwrap_err();
        assert!(matches!(err, GatewayError::Server { status: 200, .. }));
    }

    #[tokio::test]
    async fn accepted_upload_reports_document_id() {
        let mock = MockGateway::new();
        let file = UploadFile::new("notes.txt", Some("text/plain"), b"shall comply".to_vec());

        let out = Step::UploadDocument(file).execute(&mock).await.unwrap();
        assert_eq!(out.documents_uploaded, 1);
        assert_eq!(out.uploaded_document_id.as_deref(), Some("DOC-MOCK0001"));
    }

    #[test]
    fn step_kind_names() {
        assert_eq!(StepKind::RunFullPipeline.to_string(), "run-full-pipeline");
        assert_eq!(
            serde_json::to_string(&StepKind::GenerateAlertsFromLogs).unwrap(),
            "\"generate-alerts-from-logs\""
        );
    }
}
