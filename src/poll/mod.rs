//! Bounded polling of a submitted summary query
//!
//! ```text
//! SUBMITTED --submit ok--> POLLING --status SUCCEEDED / data--> SUCCEEDED
//!     |                      |  \--status FAILED / retcode != 0--> FAILED
//!     |                      \--attempts used up--> EXHAUSTED
//!     \--submit failed--> (outcome SubmitFailed)
//! ```
//!
//! Between two attempts the loop sleeps for [`PollPolicy::interval`]; it never
//! sleeps after the final attempt. There is no other way to stop a loop early.

use crate::client::{ClientError, KeyInfo, QueryStatus, ReportClient, SummaryResponse};
use crate::query::QueryParams;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Attempt cap and fixed delay of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    /// A zero attempt cap is raised to one so every loop polls at least once
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling { attempt: u32 },
    Succeeded,
    Failed,
    Exhausted,
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded {
        response: SummaryResponse,
        attempts: u32,
    },
    Failed {
        reason: String,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_error: Option<ClientError>,
    },
    SubmitFailed(ClientError),
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            Self::Succeeded { .. } => PollState::Succeeded,
            Self::Failed { .. } | Self::SubmitFailed(_) => PollState::Failed,
            Self::Exhausted { .. } => PollState::Exhausted,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Human readable cause of a failed outcome
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { reason, .. } => Some(reason.clone()),
            Self::Exhausted {
                attempts,
                last_error,
            } => Some(match last_error {
                Some(e) => format!("no result after {attempts} attempts (last error: {e})"),
                None => format!("no result after {attempts} attempts"),
            }),
            Self::SubmitFailed(e) => Some(format!("submit failed: {e}")),
        }
    }

    /// Whether the credential was rejected somewhere along the way
    pub fn auth_rejected(&self) -> bool {
        match self {
            Self::SubmitFailed(e) => e.is_auth_failure(),
            Self::Exhausted {
                last_error: Some(e),
                ..
            } => e.is_auth_failure(),
            _ => false,
        }
    }
}

/// What to do after one poll attempt
#[derive(Debug)]
enum Step {
    Done(SummaryResponse),
    Fail(String),
    Retry(Option<ClientError>),
}

fn interpret(result: Result<SummaryResponse, ClientError>) -> Step {
    let response = match result {
        Ok(response) => response,
        Err(e) if e.is_application_error() => return Step::Fail(e.to_string()),
        Err(e) => return Step::Retry(Some(e)),
    };

    if response.retcode.unwrap_or(-1) != 0 {
        return Step::Fail(format!(
            "poll response carried retcode {:?}: {}",
            response.retcode,
            response.message()
        ));
    }

    match response.query_status() {
        Some(QueryStatus::Succeeded) => Step::Done(response),
        Some(QueryStatus::Failed) => Step::Fail(format!("query failed: {}", response.message())),
        Some(QueryStatus::Running) => Step::Retry(None),
        // 0 doubles as "status not set", so a payload wins over it
        Some(QueryStatus::Pending) | None if response.has_data() => Step::Done(response),
        Some(QueryStatus::Pending) | None => Step::Retry(None),
    }
}

/// Submit-then-poll driver over any [`ReportClient`]
pub struct PollLoop<'a> {
    client: &'a dyn ReportClient,
    policy: PollPolicy,
}

impl<'a> PollLoop<'a> {
    pub fn new(client: &'a dyn ReportClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit `params` and poll until a terminal state
    pub async fn run(&self, params: &QueryParams) -> PollOutcome {
        trace!("Poll state {:?}", PollState::Submitted);
        let key_info = match self.client.submit_query(params).await {
            Ok(key_info) => key_info,
            Err(e) => {
                warn!(
                    "Submitting query for experiment {} failed: {}",
                    params.experiment_id(),
                    e
                );
                return PollOutcome::SubmitFailed(e);
            }
        };
        self.poll(params, &key_info).await
    }

    /// Poll an already submitted query
    pub async fn poll(&self, params: &QueryParams, key_info: &KeyInfo) -> PollOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            trace!("Poll state {:?}", PollState::Polling { attempt });

            match interpret(self.client.poll_once(params, key_info).await) {
                Step::Done(response) => {
                    debug!(
                        "Experiment {} result ready after {} attempt(s)",
                        params.experiment_id(),
                        attempt
                    );
                    return PollOutcome::Succeeded {
                        response,
                        attempts: attempt,
                    };
                }
                Step::Fail(reason) => {
                    warn!("Experiment {} query failed: {}", params.experiment_id(), reason);
                    return PollOutcome::Failed {
                        reason,
                        attempts: attempt,
                    };
                }
                Step::Retry(error) => {
                    if let Some(e) = &error {
                        debug!("Poll attempt {}/{} failed: {}", attempt, max_attempts, e);
                    }
                    last_error = error.or(last_error);
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        warn!(
            "Experiment {} still pending after {} attempts, giving up",
            params.experiment_id(),
            max_attempts
        );
        PollOutcome::Exhausted {
            attempts: max_attempts,
            last_error,
        }
    }
}
