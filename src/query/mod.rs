//! Query parameters for experiment summary requests
//!
//! A [`QueryParams`] value fully describes one summary query. It is built once
//! through [`QueryParamsBuilder`] and never mutated afterwards; its canonical
//! JSON serialization is hashed into the result cache key.

pub mod metrics;

pub use metrics::{default_metrics, metric_description, DEFAULT_METRICS};

use crate::error::{Error, Result};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_TEMPLATE_NAME: &str = "One Page - Search Core Metric";
pub const DEFAULT_TEMPLATE_GROUP_NAME: &str = "Rollout Checklist";
pub const DEFAULT_TEMPLATE_GROUP_TYPE: i64 = 1;

/// Days covered by the default date range
const DEFAULT_LOOKBACK_DAYS: i64 = 14;

/// Inclusive date range as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "time_start")]
    pub start: NaiveDate,
    #[serde(rename = "time_end")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidArgument(format!(
                "date range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// The last fourteen days ending today
    pub fn last_two_weeks() -> Self {
        let end = Local::now().date_naive();
        Self {
            start: end - Duration::days(DEFAULT_LOOKBACK_DAYS),
            end,
        }
    }

    /// Parse a `start,end` pair of `YYYY-MM-DD` dates
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let [start, end] = parts.as_slice() else {
            return Err(Error::InvalidArgument(format!(
                "expected `start,end` date range, got `{value}`"
            )));
        };

        let parse_date = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| Error::InvalidArgument(format!("invalid date `{s}`: {e}")))
        };

        Self::new(parse_date(*start)?, parse_date(*end)?)
    }
}

/// Immutable description of a summary query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    project_id: i64,
    experiment_id: i64,
    template_name: String,
    template_group_name: String,
    template_group_type: i64,
    dates: Vec<DateRange>,
    regions: Vec<String>,
    control: String,
    treatments: Vec<String>,
    metrics: Vec<String>,
    dims: Vec<String>,
    normalization: Option<String>,
    no_cache: bool,
}

impl QueryParams {
    pub fn builder(project_id: i64, experiment_id: i64) -> QueryParamsBuilder {
        QueryParamsBuilder::new(project_id, experiment_id)
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    pub fn experiment_id(&self) -> i64 {
        self.experiment_id
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn template_group_name(&self) -> &str {
        &self.template_group_name
    }

    pub fn template_group_type(&self) -> i64 {
        self.template_group_type
    }

    pub fn dates(&self) -> &[DateRange] {
        &self.dates
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn control(&self) -> &str {
        &self.control
    }

    pub fn treatments(&self) -> &[String] {
        &self.treatments
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn normalization(&self) -> Option<&str> {
        self.normalization.as_deref()
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// Same query aimed at another experiment
    pub fn for_experiment(&self, experiment_id: i64) -> Self {
        Self {
            experiment_id,
            ..self.clone()
        }
    }

    /// SHA-256 over the canonical serialization of every field
    ///
    /// Sequences are hashed in order, so reordered metric lists produce
    /// different fingerprints.
    pub fn fingerprint(&self) -> String {
        // Serializing a struct of plain fields cannot fail
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }

    /// Key under which results for this query are cached
    pub fn cache_key(&self) -> String {
        format!(
            "ab_metrics_{}_{}_{}",
            self.project_id,
            self.experiment_id,
            self.fingerprint()
        )
    }
}

/// Builder for [`QueryParams`], applying the service defaults
#[derive(Debug, Clone)]
pub struct QueryParamsBuilder {
    params: QueryParams,
}

impl QueryParamsBuilder {
    fn new(project_id: i64, experiment_id: i64) -> Self {
        Self {
            params: QueryParams {
                project_id,
                experiment_id,
                template_name: DEFAULT_TEMPLATE_NAME.to_string(),
                template_group_name: DEFAULT_TEMPLATE_GROUP_NAME.to_string(),
                template_group_type: DEFAULT_TEMPLATE_GROUP_TYPE,
                dates: Vec::new(),
                regions: Vec::new(),
                control: String::new(),
                treatments: Vec::new(),
                metrics: Vec::new(),
                dims: Vec::new(),
                normalization: None,
                no_cache: false,
            },
        }
    }

    pub fn template(mut self, name: impl Into<String>, group_name: impl Into<String>) -> Self {
        self.params.template_name = name.into();
        self.params.template_group_name = group_name.into();
        self
    }

    pub fn template_group_type(mut self, group_type: i64) -> Self {
        self.params.template_group_type = group_type;
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.params.dates.push(range);
        self
    }

    pub fn regions(mut self, regions: Vec<String>) -> Self {
        self.params.regions = regions;
        self
    }

    pub fn control(mut self, control: impl Into<String>) -> Self {
        self.params.control = control.into();
        self
    }

    pub fn treatments(mut self, treatments: Vec<String>) -> Self {
        self.params.treatments = treatments;
        self
    }

    pub fn metrics(mut self, metrics: Vec<String>) -> Self {
        self.params.metrics = metrics;
        self
    }

    pub fn dims(mut self, dims: Vec<String>) -> Self {
        self.params.dims = dims;
        self
    }

    pub fn normalization(mut self, normalization: Option<String>) -> Self {
        self.params.normalization = normalization.filter(|n| !n.is_empty());
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.params.no_cache = no_cache;
        self
    }

    /// Finish the query, filling in default metrics and dates when unset
    pub fn build(self) -> QueryParams {
        let mut params = self.params;
        if params.metrics.is_empty() {
            params.metrics = default_metrics();
        }
        if params.dates.is_empty() {
            params.dates.push(DateRange::last_two_weeks());
        }
        params
    }
}

/// Split a comma separated CLI list, dropping empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
