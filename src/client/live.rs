//! HTTP implementation of [`ReportClient`]

use super::types::{KeyInfo, SummaryRequest, SummaryResponse};
use super::{ClientError, ClientResult, ReportClient};
use crate::config::ApiConfig;
use crate::query::QueryParams;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, trace, warn};

pub const SUBMIT_NAMESPACE: &str =
    "content_intelligence.experiment_platform.abtest_admin_analysis.open_get_summary_key";
pub const POLL_NAMESPACE: &str =
    "content_intelligence.experiment_platform.abtest_admin_analysis.open_get_summary_result";

/// Longest slice of an error body quoted in a [`ClientError`]
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the AB report gateway
///
/// Credentials and endpoint are fixed at construction.
pub struct LiveReportClient {
    client: Client,
    endpoint: String,
    token: String,
    client_server_name: String,
    operator: String,
}

impl LiveReportClient {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint().to_string(),
            token: config.token().unwrap_or_default().to_string(),
            client_server_name: config.client_server_name.clone(),
            operator: config.operator.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one RPC and unwrap the response envelope
    async fn make_request(
        &self,
        namespace: &str,
        body: &SummaryRequest<'_>,
    ) -> ClientResult<SummaryResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        trace!("POST {} namespace={} request_id={}", self.endpoint, namespace, request_id);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("X-Client-Server-Name", &self.client_server_name)
            .header("X-Des-Namespace", namespace)
            .header("X-Token", &self.token)
            .header("X-Request-Id", &request_id)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text);
            warn!("API request failed with HTTP {}: {}", status, message);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized {
                    status: status.as_u16(),
                    message,
                },
                _ => ClientError::HttpStatus {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let result: SummaryResponse = response.json().await?;
        if let Some(retcode) = result.retcode.filter(|code| *code != 0) {
            warn!("API returned retcode {}: {}", retcode, result.message());
            return Err(ClientError::Application {
                retcode,
                message: result.message().to_string(),
            });
        }

        Ok(result)
    }
}

/// Prefer the `msg` field of a JSON error body, else a prefix of the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(ERROR_BODY_LIMIT).collect())
}

#[async_trait]
impl ReportClient for LiveReportClient {
    async fn submit_query(&self, params: &QueryParams) -> ClientResult<KeyInfo> {
        let body = SummaryRequest::submit(params, &self.operator);
        let response = self.make_request(SUBMIT_NAMESPACE, &body).await?;

        if response.retcode.is_none() {
            return Err(ClientError::Application {
                retcode: -1,
                message: "submit response carried no retcode".to_string(),
            });
        }

        match response.key_info {
            Some(key_info) if !key_info.is_empty() => {
                debug!(
                    "Submitted summary query for experiment {}",
                    params.experiment_id()
                );
                Ok(key_info)
            }
            _ => Err(ClientError::MissingKeyInfo),
        }
    }

    async fn poll_once(
        &self,
        params: &QueryParams,
        key_info: &KeyInfo,
    ) -> ClientResult<SummaryResponse> {
        let body = SummaryRequest::poll(params, &self.operator, key_info);
        self.make_request(POLL_NAMESPACE, &body).await
    }
}
