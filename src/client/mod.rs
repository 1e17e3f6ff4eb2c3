//! Client for the AB report open API
//!
//! The service answers a summary query in two phases: a submit call returns a
//! [`KeyInfo`] token, and poll calls carrying that token return the result once
//! the server-side computation has finished.
//!
//! [`ReportClient`] is implemented by [`LiveReportClient`], which talks to the
//! HTTP gateway, and [`SyntheticReportClient`], which answers every call with a
//! fixed dataset and never touches the network. Every failure is returned as a
//! [`ClientError`] value.

pub mod live;
pub mod synthetic;
pub mod types;

pub use live::LiveReportClient;
pub use synthetic::{synthetic_response, SyntheticReportClient};
pub use types::{KeyInfo, QueryStatus, SummaryResponse};

use crate::config::ApiConfig;
use crate::query::QueryParams;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Credential rejected (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Service returned retcode {retcode}: {message}")]
    Application { retcode: i64, message: String },

    #[error("Undecodable response: {0}")]
    Decode(String),

    #[error("Submit response carried no key_info")]
    MissingKeyInfo,

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl ClientError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether the service itself rejected the query
    pub fn is_application_error(&self) -> bool {
        matches!(self, Self::Application { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// The two RPCs of the summary protocol
#[async_trait]
pub trait ReportClient: Send + Sync {
    /// Submit a query and obtain the token identifying its computation
    async fn submit_query(&self, params: &QueryParams) -> ClientResult<KeyInfo>;

    /// Ask once for the result of a previously submitted query
    async fn poll_once(&self, params: &QueryParams, key_info: &KeyInfo)
        -> ClientResult<SummaryResponse>;

    /// Whether responses are synthetic rather than fetched
    fn is_synthetic(&self) -> bool {
        false
    }
}

/// Pick the live or synthetic client according to configuration
pub fn client_from_config(config: &ApiConfig) -> ClientResult<Arc<dyn ReportClient>> {
    if config.mock_mode() {
        tracing::info!("No API credential configured or mock mode forced, serving synthetic data");
        return Ok(Arc::new(SyntheticReportClient::new()));
    }
    Ok(Arc::new(LiveReportClient::new(config)?))
}
