//! End-to-end report retrieval
//!
//! [`ReportService::fetch`] checks the result cache, runs the submit/poll
//! protocol on a miss, and turns the payload into an [`ExperimentReport`].
//! Any failure of the live query falls back to the synthetic dataset; the
//! report says so through [`DataSource::Synthetic`] and `fallback_reason`.

use crate::aggregate::{
    extract_metric_lifts, summarize, ExperimentGroup, LiftResult, OverallTreatment,
};
use crate::cache::{CacheStore, FileCache, MemoryCache};
use crate::client::{client_from_config, synthetic_response, ReportClient};
use crate::compare::Comparison;
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::parser::{self, RawTable, Row};
use crate::poll::{PollLoop, PollOutcome, PollPolicy};
use crate::query::QueryParams;
use crate::report::format_report;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the numbers of a report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Synthetic,
}

/// Aggregated result for one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub experiment_id: i64,
    pub project_id: i64,
    pub source: DataSource,
    /// Why live data was replaced by the synthetic dataset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub columns: Vec<String>,
    pub body: Vec<Row>,
    pub relative: Vec<Row>,
    pub control_group_indexes: Vec<usize>,
    pub by_group: Vec<ExperimentGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_treatment: Option<OverallTreatment>,
    /// Server-reported relative lifts per non-control group
    pub lifts: BTreeMap<String, LiftResult>,
    pub formatted_text: String,
    #[serde(default)]
    pub raw: Value,
}

impl ExperimentReport {
    pub fn from_table(
        experiment_id: i64,
        project_id: i64,
        table: RawTable,
        source: DataSource,
        fallback_reason: Option<String>,
    ) -> Self {
        let summary = summarize(&table);
        let formatted_text = format_report(&summary, &table, experiment_id);
        let lifts = extract_metric_lifts(&table);

        Self {
            experiment_id,
            project_id,
            source,
            fallback_reason,
            columns: table.columns,
            body: table.body,
            relative: table.relative,
            control_group_indexes: table.control_group_indexes,
            by_group: summary.by_group,
            overall_treatment: summary.overall_treatment,
            lifts,
            formatted_text,
            raw: table.raw,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }

    /// JSON view without the untouched payload
    pub fn to_compact_json(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("raw");
        }
        Ok(value)
    }
}

pub struct ReportService {
    client: Arc<dyn ReportClient>,
    cache: Arc<dyn CacheStore>,
    policy: PollPolicy,
}

impl ReportService {
    pub fn new(
        config: &ReportConfig,
        client: Arc<dyn ReportClient>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            client,
            cache,
            policy: config.poll_policy(),
        }
    }

    /// Wire up the client and cache that `config` asks for
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        let client = client_from_config(&config.api)
            .map_err(|e| Error::Config(format!("cannot create API client: {e}")))?;
        Ok(Self::new(config, client, cache_from_config(config)))
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Fetch one experiment's report
    ///
    /// With `use_cache` false the lookup is skipped, but a live result still
    /// replaces whatever the cache held.
    pub async fn fetch(&self, params: &QueryParams, use_cache: bool) -> Result<ExperimentReport> {
        let key = params.cache_key();
        if use_cache {
            if let Some(report) = self.cached(&key) {
                debug!("Cache hit for experiment {}", params.experiment_id());
                return Ok(report);
            }
        }

        let outcome = PollLoop::new(self.client.as_ref(), self.policy)
            .run(params)
            .await;
        let report = self.build_report(params, outcome)?;

        if report.source == DataSource::Live {
            self.cache.set(&key, &serde_json::to_value(&report)?);
        }
        Ok(report)
    }

    /// Fetch several experiments concurrently and compare their lifts
    ///
    /// Experiments that fail are skipped; at least two must succeed.
    pub async fn compare(
        &self,
        experiment_ids: &[i64],
        template: &QueryParams,
        metrics: &[String],
        sort_by: Option<&str>,
    ) -> Result<Comparison> {
        let fetches = experiment_ids.iter().map(|&experiment_id| {
            let params = template.for_experiment(experiment_id);
            async move { (experiment_id, self.fetch(&params, true).await) }
        });

        let mut reports = Vec::new();
        for (experiment_id, result) in join_all(fetches).await {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Skipping experiment {}: {}", experiment_id, e),
            }
        }

        if reports.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "{} of {} experiments returned data, at least 2 are needed",
                reports.len(),
                experiment_ids.len()
            )));
        }

        Ok(Comparison::new(
            experiment_ids.to_vec(),
            &reports,
            metrics,
            sort_by,
        ))
    }

    fn cached(&self, key: &str) -> Option<ExperimentReport> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(report) => Some(report),
            Err(e) => {
                debug!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn build_report(&self, params: &QueryParams, outcome: PollOutcome) -> Result<ExperimentReport> {
        let experiment_id = params.experiment_id();
        let project_id = params.project_id();

        let reason = match outcome {
            PollOutcome::Succeeded { response, attempts } => match parser::parse(&response) {
                Some(table) => {
                    let source = if self.client.is_synthetic() {
                        DataSource::Synthetic
                    } else {
                        DataSource::Live
                    };
                    info!(
                        "Experiment {} report ready ({} rows, {} attempt(s))",
                        experiment_id,
                        table.body.len(),
                        attempts
                    );
                    return Ok(ExperimentReport::from_table(
                        experiment_id,
                        project_id,
                        table,
                        source,
                        None,
                    ));
                }
                None => "completed query carried no data".to_string(),
            },
            other => {
                let reason = other
                    .failure_reason()
                    .unwrap_or_else(|| "query did not complete".to_string());
                if other.auth_rejected() {
                    warn!(
                        "AB service rejected the API token for experiment {}; check AB_API_TOKEN",
                        experiment_id
                    );
                }
                reason
            }
        };

        warn!(
            "Falling back to synthetic data for experiment {}: {}",
            experiment_id, reason
        );
        let table = parser::parse(&synthetic_response(experiment_id))
            .ok_or(Error::NoData(experiment_id))?;
        Ok(ExperimentReport::from_table(
            experiment_id,
            project_id,
            table,
            DataSource::Synthetic,
            Some(reason),
        ))
    }
}

fn cache_from_config(config: &ReportConfig) -> Arc<dyn CacheStore> {
    let settings = &config.cache;
    if !settings.enabled {
        return Arc::new(MemoryCache::with_ttl(settings.ttl));
    }

    let dir = settings.resolved_dir();
    match FileCache::with_ttl(dir.clone(), settings.ttl) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(
                "Cache directory {} unusable ({}), keeping results in memory",
                dir.display(),
                e
            );
            Arc::new(MemoryCache::with_ttl(settings.ttl))
        }
    }
}
