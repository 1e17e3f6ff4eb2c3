//! Side-by-side comparison of several experiments' lifts

use crate::aggregate::{lift_group_label, metric_columns};
use crate::pipeline::{DataSource, ExperimentReport};
use crate::report::format_comparison;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

const LIFT_SUFFIX: &str = "_lift";
const MOCK_MODE_REASON: &str = "mock mode";

/// One non-control group of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub experiment_id: i64,
    pub group: String,
    pub source: DataSource,
    /// `<metric>_lift` to server-reported lift
    #[serde(flatten)]
    pub lifts: BTreeMap<String, f64>,
}

impl ComparisonRow {
    pub fn lift(&self, metric: &str) -> Option<f64> {
        self.lifts.get(&format!("{metric}{LIFT_SUFFIX}")).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedExperiment {
    pub experiment_id: i64,
    pub lift: f64,
    pub source: DataSource,
}

/// Experiments ordered by their lift on one metric, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub metric: String,
    pub entries: Vec<RankedExperiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Every requested experiment, fetched or not
    pub experiment_ids: Vec<i64>,
    /// Experiments that produced a report, in request order
    pub fetched_ids: Vec<i64>,
    pub metric_columns: Vec<String>,
    pub table: Vec<ComparisonRow>,
    pub experiment_count: usize,
    /// Experiments answered from the synthetic dataset, with the reason
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub synthetic: BTreeMap<i64, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
    pub formatted_text: String,
}

impl Comparison {
    /// Compare `reports`, restricted to `metrics` when given
    ///
    /// Without explicit metrics the first report's metric columns are shown.
    /// A ranking is only built when `sort_by` is one of the shown metrics.
    pub fn new(
        experiment_ids: Vec<i64>,
        reports: &[ExperimentReport],
        metrics: &[String],
        sort_by: Option<&str>,
    ) -> Self {
        let shown_metrics = if metrics.is_empty() {
            reports
                .first()
                .map(|r| metric_columns(&r.columns))
                .unwrap_or_default()
        } else {
            metrics.to_vec()
        };

        let table = reports
            .iter()
            .flat_map(|report| comparison_rows(report, metrics))
            .collect();

        let synthetic = reports
            .iter()
            .filter(|r| r.is_synthetic())
            .map(|r| {
                let reason = r
                    .fallback_reason
                    .clone()
                    .unwrap_or_else(|| MOCK_MODE_REASON.to_string());
                (r.experiment_id, reason)
            })
            .collect();

        let mut comparison = Self {
            experiment_ids,
            fetched_ids: reports.iter().map(|r| r.experiment_id).collect(),
            metric_columns: shown_metrics,
            table,
            experiment_count: reports.len(),
            synthetic,
            ranking: None,
            formatted_text: String::new(),
        };

        comparison.ranking = sort_by
            .filter(|metric| comparison.metric_columns.iter().any(|m| m == metric))
            .map(|metric| comparison.rank_by(metric));
        comparison.formatted_text = format_comparison(&comparison);
        comparison
    }

    pub fn is_synthetic(&self, experiment_id: i64) -> bool {
        self.synthetic.contains_key(&experiment_id)
    }

    /// Lift of the first group of `experiment_id` that reports `metric`
    ///
    /// Groups are tried in the order the service listed them.
    pub fn first_lift(&self, experiment_id: i64, metric: &str) -> Option<f64> {
        self.table
            .iter()
            .filter(|row| row.experiment_id == experiment_id)
            .find_map(|row| row.lift(metric))
    }

    fn rank_by(&self, metric: &str) -> Ranking {
        let mut entries: Vec<RankedExperiment> = self
            .fetched_ids
            .iter()
            .filter_map(|&experiment_id| {
                self.first_lift(experiment_id, metric)
                    .map(|lift| RankedExperiment {
                        experiment_id,
                        lift,
                        source: self.source_of(experiment_id),
                    })
            })
            .collect();
        entries.sort_by(|a, b| b.lift.partial_cmp(&a.lift).unwrap_or(Ordering::Equal));

        Ranking {
            metric: metric.to_string(),
            entries,
        }
    }

    fn source_of(&self, experiment_id: i64) -> DataSource {
        if self.is_synthetic(experiment_id) {
            DataSource::Synthetic
        } else {
            DataSource::Live
        }
    }
}

// One row per non-control group, in `relative` row order
fn comparison_rows(report: &ExperimentReport, metrics: &[String]) -> Vec<ComparisonRow> {
    let targets = if metrics.is_empty() {
        metric_columns(&report.columns)
    } else {
        metrics.to_vec()
    };

    let mut seen = HashSet::new();
    report
        .relative
        .iter()
        .map(lift_group_label)
        .filter(|group| seen.insert(*group))
        .filter_map(|group| {
            let lifts = report.lifts.get(group)?;
            let values: BTreeMap<String, f64> = targets
                .iter()
                .filter_map(|m| lifts.get(m).map(|v| (format!("{m}{LIFT_SUFFIX}"), *v)))
                .collect();
            (!values.is_empty()).then(|| ComparisonRow {
                experiment_id: report.experiment_id,
                group: group.to_string(),
                source: report.source,
                lifts: values,
            })
        })
        .collect()
}
