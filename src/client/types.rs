//! Wire types shared by the submit and poll RPCs

use crate::query::{DateRange, QueryParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque continuation token returned by the submit call
///
/// The client never interprets it beyond reading an embedded `status`; it is
/// sent back verbatim on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyInfo(Value);

impl KeyInfo {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Whether the token is falsy: null, `false`, zero or an empty container
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null | Value::Bool(false) => true,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(true) => false,
        }
    }

    /// Status code echoed inside the token, if any
    pub fn status(&self) -> Option<i64> {
        self.0.get("status").and_then(Value::as_i64)
    }
}

/// State of the server-side computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Pending,
    Running,
    Failed,
    Succeeded,
}

impl QueryStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Running),
            2 => Some(Self::Failed),
            3 => Some(Self::Succeeded),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Failed => 2,
            Self::Succeeded => 3,
        }
    }
}

/// Response envelope of both RPCs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<KeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SummaryResponse {
    /// Status of the computation
    ///
    /// The top-level `status` wins unless it is absent or 0 (the wire default),
    /// in which case the status echoed inside `key_info` is used.
    pub fn query_status(&self) -> Option<QueryStatus> {
        let code = match self.status {
            Some(code) if code != 0 => code,
            _ => self
                .key_info
                .as_ref()
                .and_then(KeyInfo::status)
                .unwrap_or(0),
        };
        QueryStatus::from_code(code)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or("")
    }
}

/// JSON body of the submit and poll requests
#[derive(Debug, Serialize)]
pub(crate) struct SummaryRequest<'a> {
    project_id: i64,
    experiment_id: i64,
    operator: &'a str,
    template_name: &'a str,
    template_group_name: &'a str,
    template_group_type: i64,
    dates: &'a [DateRange],
    regions: &'a [String],
    control: &'a str,
    treatments: &'a [String],
    metrics: &'a [String],
    dims: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    normalization: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_info: Option<&'a KeyInfo>,
}

impl<'a> SummaryRequest<'a> {
    pub(crate) fn submit(params: &'a QueryParams, operator: &'a str) -> Self {
        Self {
            no_cache: Some(params.no_cache()),
            ..Self::base(params, operator)
        }
    }

    pub(crate) fn poll(params: &'a QueryParams, operator: &'a str, key_info: &'a KeyInfo) -> Self {
        Self {
            key_info: Some(key_info),
            ..Self::base(params, operator)
        }
    }

    fn base(params: &'a QueryParams, operator: &'a str) -> Self {
        Self {
            project_id: params.project_id(),
            experiment_id: params.experiment_id(),
            operator,
            template_name: params.template_name(),
            template_group_name: params.template_group_name(),
            template_group_type: params.template_group_type(),
            dates: params.dates(),
            regions: params.regions(),
            control: params.control(),
            treatments: params.treatments(),
            metrics: params.metrics(),
            dims: params.dims(),
            normalization: params.normalization(),
            no_cache: None,
            key_info: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_key_info_is_empty() {
        for value in [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!([]),
            json!({}),
        ] {
            assert!(KeyInfo::new(value.clone()).is_empty(), "{value}");
        }
        for value in [json!(true), json!(7), json!("k"), json!([1]), json!({"key": "k"})] {
            assert!(!KeyInfo::new(value.clone()).is_empty(), "{value}");
        }
    }

    #[test]
    fn test_status_codes() {
        for status in [
            QueryStatus::Pending,
            QueryStatus::Running,
            QueryStatus::Failed,
            QueryStatus::Succeeded,
        ] {
            assert_eq!(QueryStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(QueryStatus::from_code(9), None);
    }

    #[test]
    fn test_status_falls_back_to_key_info() {
        let response: SummaryResponse = serde_json::from_value(json!({
            "retcode": 0,
            "status": 0,
            "key_info": {"key": "abc", "status": 1}
        }))
        .unwrap();
        assert_eq!(response.query_status(), Some(QueryStatus::Running));

        let response: SummaryResponse = serde_json::from_value(json!({
            "retcode": 0,
            "key_info": {"key": "abc", "status": 3}
        }))
        .unwrap();
        assert_eq!(response.query_status(), Some(QueryStatus::Succeeded));
    }

    #[test]
    fn test_top_level_status_wins() {
        let response: SummaryResponse = serde_json::from_value(json!({
            "retcode": 0,
            "status": 2,
            "key_info": {"status": 3}
        }))
        .unwrap();
        assert_eq!(response.query_status(), Some(QueryStatus::Failed));
    }

    #[test]
    fn test_absent_status_reads_as_pending() {
        let response = SummaryResponse::default();
        assert_eq!(response.query_status(), Some(QueryStatus::Pending));
        assert!(!response.has_data());
    }

    #[test]
    fn test_key_info_emptiness() {
        assert!(KeyInfo::default().is_empty());
        assert!(KeyInfo::new(json!({})).is_empty());
        assert!(!KeyInfo::new(json!({"key": "k1"})).is_empty());
    }

    #[test]
    fn test_request_bodies() {
        let params = QueryParams::builder(27, 1001)
            .metrics(vec!["gmv".into()])
            .no_cache(true)
            .build();
        let key = KeyInfo::new(json!({"key": "k1"}));

        let submit = serde_json::to_value(SummaryRequest::submit(&params, "alice")).unwrap();
        assert_eq!(submit["operator"], "alice");
        assert_eq!(submit["no_cache"], true);
        assert_eq!(submit["metrics"], json!(["gmv"]));
        assert!(submit.get("key_info").is_none());
        assert!(submit.get("normalization").is_none());

        let poll = serde_json::to_value(SummaryRequest::poll(&params, "alice", &key)).unwrap();
        assert_eq!(poll["key_info"], json!({"key": "k1"}));
        assert!(poll.get("no_cache").is_none());
        assert_eq!(poll["template_group_type"], 1);
    }
}
