//! Offline stand-in for the AB report service
//!
//! Used when no credential is configured, and as the fallback dataset when a
//! live query fails. The data is fixed: one control and one treatment group
//! with a single `ctr` metric.

use super::types::{KeyInfo, QueryStatus, SummaryResponse};
use super::{ClientResult, ReportClient};
use crate::query::QueryParams;
use async_trait::async_trait;
use serde_json::json;

/// The fixed synthetic result in wire form
pub fn synthetic_response(experiment_id: i64) -> SummaryResponse {
    SummaryResponse {
        retcode: Some(0),
        msg: Some("synthetic".to_string()),
        status: Some(QueryStatus::Succeeded.code()),
        key_info: Some(synthetic_key(experiment_id)),
        data: Some(json!({
            "header": "group_name||ctr",
            "body": ["Control Group||0.045", "Treatment Group||0.051"],
            "relative": ["Control Group||0.000000", "Treatment Group||0.133333"],
            "control_group_indexes": [0],
        })),
    }
}

fn synthetic_key(experiment_id: i64) -> KeyInfo {
    KeyInfo::new(json!({
        "synthetic": true,
        "experiment_id": experiment_id,
        "status": QueryStatus::Succeeded.code(),
    }))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticReportClient;

impl SyntheticReportClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportClient for SyntheticReportClient {
    async fn submit_query(&self, params: &QueryParams) -> ClientResult<KeyInfo> {
        Ok(synthetic_key(params.experiment_id()))
    }

    async fn poll_once(
        &self,
        params: &QueryParams,
        _key_info: &KeyInfo,
    ) -> ClientResult<SummaryResponse> {
        Ok(synthetic_response(params.experiment_id()))
    }

    fn is_synthetic(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_round() {
        let client = SyntheticReportClient::new();
        let params = QueryParams::builder(27, 1001).build();

        let key = client.submit_query(&params).await.unwrap();
        assert!(!key.is_empty());

        let response = client.poll_once(&params, &key).await.unwrap();
        assert_eq!(response.retcode, Some(0));
        assert_eq!(response.query_status(), Some(QueryStatus::Succeeded));
        assert!(response.has_data());
    }

    #[test]
    fn test_synthetic_response_is_deterministic() {
        assert_eq!(synthetic_response(1), synthetic_response(1));
    }
}
