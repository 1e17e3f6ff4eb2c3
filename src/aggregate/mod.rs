//! Group-aware aggregation of summary rows
//!
//! Rows are partitioned into experiment groups, metric columns are summed per
//! group, and every treatment is compared with the control group.

pub mod lift;

pub use lift::{
    compute_lift, extract_metric_lifts, lift_group_label, overall_treatment, LiftResult,
};

use crate::parser::{RawTable, Row};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Column carrying the raw variant identifier
pub const VARIANT_COLUMN: &str = "abtest_group";
/// Columns carrying a group label, in lookup order
pub const LABEL_COLUMNS: &[&str] = &["group_prefix", "group_name"];
pub const REGION_COLUMN: &str = "abtest_region";
pub const DATE_COLUMN: &str = "abtest_date";
/// Grouping key used when a row identifies no group at all
pub const CATCH_ALL_GROUP: &str = "all";

/// Columns describing grouping context rather than measurements
pub const DIMENSION_COLUMNS: &[&str] = &[
    "group_prefix",
    "group_name",
    VARIANT_COLUMN,
    REGION_COLUMN,
    DATE_COLUMN,
];

/// Summed metric values, metric name to total
pub type MetricValues = BTreeMap<String, f64>;

/// Columns that hold metrics, in table order
pub fn metric_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| !DIMENSION_COLUMNS.contains(&c.as_str()))
        .cloned()
        .collect()
}

/// Parse a cell as a finite number
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentGroup {
    /// Display label
    pub group_key: String,
    /// Raw variant identifier, when rows carry one
    pub group_id: Option<String>,
    pub is_control: bool,
    pub member_rows: Vec<Row>,
    pub aggregate: MetricValues,
    /// Lift against the control group; absent for controls or without a control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lift: Option<LiftResult>,
}

/// Treatment groups summed together and compared with control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallTreatment {
    pub groups: Vec<String>,
    pub aggregate: MetricValues,
    pub lift: LiftResult,
}

/// Per-group view of a summary table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedSummary {
    pub metric_columns: Vec<String>,
    pub by_group: Vec<ExperimentGroup>,
    pub overall_treatment: Option<OverallTreatment>,
}

impl GroupedSummary {
    pub fn control(&self) -> Option<&ExperimentGroup> {
        self.by_group.iter().find(|g| g.is_control)
    }

    pub fn treatments(&self) -> impl Iterator<Item = &ExperimentGroup> {
        self.by_group.iter().filter(|g| !g.is_control)
    }
}

/// Sum every numeric cell of each metric column
///
/// Metrics without a single numeric cell are left out rather than reported as 0.
pub fn aggregate_metrics(rows: &[Row], metric_columns: &[String]) -> MetricValues {
    metric_columns
        .iter()
        .filter_map(|metric| {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| row.get(metric).and_then(|cell| parse_number(cell)))
                .collect();
            (!values.is_empty()).then(|| (metric.clone(), values.iter().sum::<f64>()))
        })
        .collect()
}

/// Partition rows into experiment groups, control first
pub fn group_rows(body: &[Row], metric_columns: &[String]) -> Vec<ExperimentGroup> {
    build_groups(body, metric_columns, &HashSet::new())
}

/// Group, aggregate, and compute lifts for a whole table
///
/// Rows listed in `control_group_indexes` mark their group as control in
/// addition to the label rule.
pub fn summarize(table: &RawTable) -> GroupedSummary {
    let metrics = metric_columns(&table.columns);
    let control_rows: HashSet<usize> = table.control_group_indexes.iter().copied().collect();
    let mut groups = build_groups(&table.body, &metrics, &control_rows);

    let control = groups.iter().find(|g| g.is_control).map(|g| g.aggregate.clone());
    if let Some(control) = &control {
        for group in groups.iter_mut().filter(|g| !g.is_control) {
            group.lift = Some(compute_lift(&group.aggregate, control, &metrics));
        }
    }

    let overall = overall_treatment(&groups, &metrics);
    GroupedSummary {
        metric_columns: metrics,
        by_group: groups,
        overall_treatment: overall,
    }
}

/// How a row identifies its group
struct GroupIdentity {
    key: String,
    variant_id: Option<String>,
    label: Option<String>,
}

fn non_empty<'r>(row: &'r Row, column: &str) -> Option<&'r str> {
    row.get(column).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn row_label(row: &Row) -> Option<&str> {
    LABEL_COLUMNS.iter().find_map(|c| non_empty(row, c))
}

fn identify(row: &Row) -> GroupIdentity {
    let variant_id = non_empty(row, VARIANT_COLUMN).map(str::to_string);
    let label = row_label(row).map(str::to_string);
    let key = variant_id
        .clone()
        .or_else(|| label.clone())
        .unwrap_or_else(|| CATCH_ALL_GROUP.to_string());
    GroupIdentity {
        key,
        variant_id,
        label,
    }
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// Label shown for a group: numeric ids get a role prefix, anything else is kept
pub fn display_label(identifier: &str, is_control: bool) -> String {
    if is_numeric_id(identifier) {
        let role = if is_control { "Control" } else { "Treatment" };
        format!("{role} ({identifier})")
    } else {
        identifier.to_string()
    }
}

/// Descending identifier order, numeric when both sides are numbers
fn compare_identifiers_desc(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        _ => b.cmp(a),
    }
}

fn build_groups(
    body: &[Row],
    metric_columns: &[String],
    control_rows: &HashSet<usize>,
) -> Vec<ExperimentGroup> {
    struct Pending {
        identity: GroupIdentity,
        is_control: bool,
        rows: Vec<Row>,
    }

    let mut order: Vec<Pending> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (row_index, row) in body.iter().enumerate() {
        let identity = identify(row);
        let slot = match index.get(&identity.key) {
            Some(&slot) => slot,
            None => {
                let first_label = identity.label.as_deref().unwrap_or(&identity.key);
                let is_control = first_label.to_lowercase().contains("control");
                index.insert(identity.key.clone(), order.len());
                order.push(Pending {
                    identity,
                    is_control,
                    rows: Vec::new(),
                });
                order.len() - 1
            }
        };

        let group = &mut order[slot];
        if control_rows.contains(&row_index) {
            group.is_control = true;
        }
        group.rows.push(row.clone());
    }

    let mut groups: Vec<ExperimentGroup> = order
        .into_iter()
        .map(|pending| ExperimentGroup {
            group_key: display_label(&pending.identity.key, pending.is_control),
            aggregate: aggregate_metrics(&pending.rows, metric_columns),
            group_id: pending.identity.variant_id,
            is_control: pending.is_control,
            member_rows: pending.rows,
            lift: None,
        })
        .collect();

    groups.sort_by(|a, b| {
        b.is_control.cmp(&a.is_control).then_with(|| {
            let a_id = a.group_id.as_deref().unwrap_or(&a.group_key);
            let b_id = b.group_id.as_deref().unwrap_or(&b.group_key);
            compare_identifiers_desc(a_id, b_id)
        })
    });
    groups
}
