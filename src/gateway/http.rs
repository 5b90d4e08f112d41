use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;

use super::wire::{
    CountResponse, ErrorResponse, GenerateDataResponse, HealthResponse,
    InitializeSamplesResponse, PipelineResponse, UploadResponse,
};
use super::{
    validate_document_count, validate_document_id, validate_log_count,
    validate_pipeline_params, validate_trend_days, validate_upload_name, AlertGenerationReport,
    AnalyzeAllReport, ComplianceGateway, GatewayError, PipelineParams, PipelineReport,
    SampleInitReport, SyntheticDataReport, ThresholdAlertOptions, UploadReceipt,
};
use crate::config::ConsoleConfig;
use crate::models::{Alert, ComplianceTrends, Document, DocumentAnalysis};
use crate::upload::UploadFile;

/// HTTP transport for the compliance backend.
///
/// Transport-level timeouts are configured here and nowhere else.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway for `base_url` (including the `/api/v1` prefix).
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            request_timeout,
        })
    }

    pub fn from_config(config: &ConsoleConfig) -> Result<Self, GatewayError> {
        Self::new(
            &config.api_base_url,
            config.request_timeout(),
            config.connect_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/health` lives at the server root, outside the versioned prefix.
    fn health_url(&self) -> String {
        match self.base_url.find("/api/") {
            Some(idx) => format!("{}/health", &self.base_url[..idx]),
            None => format!("{}/health", self.base_url),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        read_json(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        read_json(response).await
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_connect() {
            GatewayError::Network(format!("Cannot reach compliance API at {}", self.base_url))
        } else if e.is_timeout() {
            GatewayError::Network(format!(
                "Request timed out after {}s",
                self.request_timeout.as_secs()
            ))
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message())
            .unwrap_or(body);
        return Err(GatewayError::Server {
            status: status.as_u16(),
            message,
        });
    }

    response.json().await.map_err(|e| GatewayError::Server {
        status: status.as_u16(),
        message: format!("Malformed response body: {e}"),
    })
}

impl ComplianceGateway for HttpGateway {
    fn upload_document<'a>(
        &'a self,
        file: &'a UploadFile,
    ) -> BoxFuture<'a, Result<UploadReceipt, GatewayError>> {
        Box::pin(async move {
            validate_upload_name(file)?;
            let part = reqwest::multipart::Part::bytes(file.contents().to_vec())
                .file_name(file.file_name().to_string())
                .mime_str(file.mime_type())
                .map_err(|e| GatewayError::Validation(e.to_string()))?;
            let form = reqwest::multipart::Form::new().part("file", part);

            let url = self.url("/documents/upload");
            tracing::debug!(%url, file = file.file_name(), "POST multipart");
            let response = self
                .client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            let body: UploadResponse = read_json(response).await?;
            Ok(body.into())
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
            let body: GenerateDataResponse = self
                .post_json(
                    self.url("/processing/generate-data"),
                    &[
                        ("document_count", document_count.to_string()),
                        ("log_count", log_count.to_string()),
                    ],
                )
                .await?;
            Ok(body.into())
        })
    }

    fn analyze_document<'a>(
        &'a self,
        document_id: &'a str,
    ) -> BoxFuture<'a, Result<DocumentAnalysis, GatewayError>> {
        Box::pin(async move {
            validate_document_id(document_id)?;
            self.post_json(
                self.url("/documents/analyze"),
                &[("document_id", document_id.trim().to_string())],
            )
            .await
        })
    }

    fn analyze_all_documents(&self) -> BoxFuture<'_, Result<AnalyzeAllReport, GatewayError>> {
        Box::pin(async move {
            let body: CountResponse = self
                .post_json(self.url("/processing/analyze-documents"), &[])
                .await?;
            Ok(body.into())
        })
    }

    fn generate_alerts_from_logs(
        &self,
    ) -> BoxFuture<'_, Result<AlertGenerationReport, GatewayError>> {
        Box::pin(async move {
            let body: CountResponse = self
                .post_json(self.url("/processing/generate-alerts"), &[])
                .await?;
            Ok(body.into())
        })
    }

    fn generate_threshold_alerts(
        &self,
        options: ThresholdAlertOptions,
    ) -> BoxFuture<'_, Result<Vec<Alert>, GatewayError>> {
        Box::pin(async move {
            self.post_json(
                self.url("/alerts/generate"),
                &[
                    ("analyze_operational_logs", options.analyze_operational_logs.to_string()),
                    ("check_thresholds", options.check_thresholds.to_string()),
                    ("include_historical", options.include_historical.to_string()),
                ],
            )
            .await
        })
    }

    fn run_full_pipeline(
        &self,
        params: PipelineParams,
    ) -> BoxFuture<'_, Result<PipelineReport, GatewayError>> {
        Box::pin(async move {
            validate_pipeline_params(&params)?;
            let body: PipelineResponse = self
                .post_json(
                    self.url("/processing/run-pipeline"),
                    &[
                        ("generate_new_data", params.generate_new_data.to_string()),
                        ("document_count", params.document_count.to_string()),
                        ("log_count", params.log_count.to_string()),
                    ],
                )
                .await?;
            Ok(body.into())
        })
    }

    fn initialize_samples(
        &self,
        document_count: u32,
    ) -> BoxFuture<'_, Result<SampleInitReport, GatewayError>> {
        Box::pin(async move {
            validate_document_count(document_count)?;
            let body: InitializeSamplesResponse = self
                .post_json(
                    self.url("/processing/initialize-samples"),
                    &[("document_count", document_count.to_string())],
                )
                .await?;
            Ok(body.into())
        })
    }

    fn fetch_documents(&self) -> BoxFuture<'_, Result<Vec<Document>, GatewayError>> {
        Box::pin(async move { self.get_json(self.url("/documents/"), &[]).await })
    }

    fn fetch_alerts(&self) -> BoxFuture<'_, Result<Vec<Alert>, GatewayError>> {
        Box::pin(async move { self.get_json(self.url("/alerts/"), &[]).await })
    }

    fn fetch_compliance_trends(
        &self,
        days: u32,
    ) -> BoxFuture<'_, Result<ComplianceTrends, GatewayError>> {
        Box::pin(async move {
            validate_trend_days(days)?;
            self.get_json(self.url("/analytics/trends"), &[("days", days.to_string())])
                .await
        })
    }

    fn health_check(&self) -> BoxFuture<'_, Result<bool, GatewayError>> {
        Box::pin(async move {
            let body: HealthResponse = self.get_json(self.health_url(), &[]).await?;
            Ok(body.status == "healthy")
        })
    }
}
