//! Common test utilities and helpers
//!
//! [`FakeGateway`] is a local stand-in for the AB report gateway: a single
//! POST route that dispatches on the `X-Des-Namespace` header and replays a
//! scripted sequence of poll replies.

#![allow(dead_code)]

use ab_report::client::live::{POLL_NAMESPACE, SUBMIT_NAMESPACE};
use ab_report::config::ReportConfig;
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::Json, routing::post, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_TOKEN: &str = "test-token";

/// Recorded traffic and scripted replies of a [`FakeGateway`]
pub struct GatewayState {
    submit_status: StatusCode,
    submit_reply: Value,
    poll_script: Mutex<VecDeque<Value>>,
    submits: AtomicUsize,
    polls: AtomicUsize,
    requests: Mutex<Vec<(HeaderMap, Value)>>,
}

impl GatewayState {
    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Headers and JSON body of every request, oldest first
    pub fn requests(&self) -> Vec<(HeaderMap, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

pub struct FakeGateway {
    pub url: String,
    pub state: Arc<GatewayState>,
}

impl FakeGateway {
    /// Gateway that accepts every submit and answers polls from `script`
    ///
    /// Once the script runs out the last reply is repeated.
    pub async fn start(script: Vec<Value>) -> Self {
        Self::start_with_submit(StatusCode::OK, submit_ok(), script).await
    }

    pub async fn start_with_submit(
        submit_status: StatusCode,
        submit_reply: Value,
        script: Vec<Value>,
    ) -> Self {
        let state = Arc::new(GatewayState {
            submit_status,
            submit_reply,
            poll_script: Mutex::new(script.into()),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/request_spex", post(rpc))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake gateway");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}/request_spex"),
            state,
        }
    }

    /// Configuration pointing the live client at this gateway
    pub fn config(&self, cache_dir: &Path) -> ReportConfig {
        let mut config = ReportConfig::default();
        config.api.api_url = Some(self.url.clone());
        config.api.token = Some(TEST_TOKEN.to_string());
        config.api.client_server_name = "ab-report-tests".to_string();
        config.api.operator = "tester".to_string();
        config.api.timeout = Duration::from_secs(5);
        config.api.poll_interval = Duration::from_millis(10);
        config.api.max_poll_attempts = 5;
        config.cache.dir = Some(cache_dir.to_path_buf());
        config
    }
}

async fn rpc(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let namespace = headers
        .get("X-Des-Namespace")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .requests
        .lock()
        .unwrap()
        .push((headers.clone(), body));

    if namespace == SUBMIT_NAMESPACE {
        state.submits.fetch_add(1, Ordering::SeqCst);
        return (state.submit_status, Json(state.submit_reply.clone()));
    }
    if namespace == POLL_NAMESPACE {
        state.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = state.poll_script.lock().unwrap();
        let reply = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        return (StatusCode::OK, Json(reply.unwrap_or_else(running)));
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"msg": format!("unknown namespace {namespace}")})),
    )
}

pub fn submit_ok() -> Value {
    json!({"retcode": 0, "msg": "ok", "key_info": {"key": "summary-1", "status": 0}})
}

pub fn running() -> Value {
    json!({"retcode": 0, "msg": "ok", "status": 1})
}

pub fn failed() -> Value {
    json!({"retcode": 0, "msg": "template error", "status": 2})
}

/// A finished result with one control and two treatment variants
pub fn succeeded() -> Value {
    json!({
        "retcode": 0,
        "msg": "ok",
        "status": 3,
        "data": {
            "columns": ["abtest_date", "abtest_group", "group_name", "gmv", "order_cnt"],
            "body": [
                "2024-03-01||82930||control||500||40",
                "2024-03-02||82930||control||500||60",
                "2024-03-01||82931||treatment a||550||45",
                "2024-03-02||82931||treatment a||550||55",
                "2024-03-01||82932||treatment b||480||50",
            ],
            "relative": [
                "||82930||control||0||0",
                "||82931||treatment a||0.1||0",
                "||82932||treatment b||-0.52||-0.5",
            ],
            "control_group_indexes": [0, 1],
        }
    })
}
