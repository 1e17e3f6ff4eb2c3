//! Plain-text rendering of experiment summaries
//!
//! The text is for people. Anything consuming results programmatically should
//! use the JSON view of [`crate::pipeline::ExperimentReport`] instead.

use crate::aggregate::{
    ExperimentGroup, GroupedSummary, LiftResult, MetricValues, OverallTreatment, DATE_COLUMN,
    REGION_COLUMN,
};
use crate::compare::Comparison;
use crate::parser::{RawTable, Row};
use crate::pipeline::DataSource;
use std::fmt::Write;

pub const NO_DATA: &str = "No data";
/// Rendered for a metric an experiment does not report
pub const MISSING_VALUE: &str = "N/A";
const SYNTHETIC_MARK: &str = "(synthetic)";

const HEADER_RULE_WIDTH: usize = 50;
const COMPARISON_RULE_WIDTH: usize = 60;

/// Render a lift ratio as a signed percentage, e.g. `0.1` as `+10.00%`
pub fn format_lift(lift: f64) -> String {
    let pct = lift * 100.0;
    let text = format!("{pct:.2}");
    if text == "0.00" || text == "-0.00" {
        return "0.00%".to_string();
    }
    let sign = if pct > 0.0 { "+" } else { "" };
    format!("{sign}{text}%")
}

/// Fixed-precision rendering of an aggregate value
pub fn format_value(value: f64) -> String {
    format!("{value:.6}")
}

/// Render the grouped view of `table` for `experiment_id`
///
/// An `experiment_id` of 0 suppresses the header.
pub fn format_report(summary: &GroupedSummary, table: &RawTable, experiment_id: i64) -> String {
    if table.is_empty() || summary.by_group.is_empty() {
        return NO_DATA.to_string();
    }

    let mut lines = Vec::new();
    if experiment_id != 0 {
        lines.push(format!("Experiment {experiment_id} summary"));
        lines.push("=".repeat(HEADER_RULE_WIDTH));
    }

    for group in &summary.by_group {
        lines.push(String::new());
        push_group(&mut lines, group, &summary.metric_columns);
    }

    if let Some(overall) = &summary.overall_treatment {
        lines.push(String::new());
        push_overall(&mut lines, overall, &summary.metric_columns);
    }

    lines.join("\n")
}

fn push_group(lines: &mut Vec<String>, group: &ExperimentGroup, metrics: &[String]) {
    if group.is_control {
        lines.push(format!("[{}] (control)", group.group_key));
    } else {
        lines.push(format!("[{}]", group.group_key));
    }
    push_values(lines, &group.aggregate, metrics);

    if let Some(lift) = &group.lift {
        push_lift(lines, lift, metrics);
    }

    lines.push("  rows:".to_string());
    for row in &group.member_rows {
        lines.push(format!("    - {}: {}", row_label(row), row_values(row, metrics)));
    }
}

fn push_overall(lines: &mut Vec<String>, overall: &OverallTreatment, metrics: &[String]) {
    lines.push(format!("[Overall treatment] ({})", overall.groups.join(", ")));
    push_values(lines, &overall.aggregate, metrics);
    push_lift(lines, &overall.lift, metrics);
}

fn push_values(lines: &mut Vec<String>, values: &MetricValues, metrics: &[String]) {
    for metric in metrics {
        if let Some(value) = values.get(metric) {
            lines.push(format!("  {metric}: {}", format_value(*value)));
        }
    }
}

fn push_lift(lines: &mut Vec<String>, lift: &LiftResult, metrics: &[String]) {
    lines.push("  lift vs control:".to_string());
    for metric in metrics {
        if let Some(value) = lift.get(metric) {
            lines.push(format!("    {metric}: {}", format_lift(*value)));
        }
    }
}

/// `<date> / <region>` for a detail row, `all` when it carries neither
fn row_label(row: &Row) -> String {
    let parts: Vec<&str> = [DATE_COLUMN, REGION_COLUMN]
        .iter()
        .filter_map(|c| row.get(*c).map(|s| s.as_str()).filter(|s| !s.is_empty()))
        .collect();
    if parts.is_empty() {
        "all".to_string()
    } else {
        parts.join(" / ")
    }
}

// Cells are echoed as received so the detail lines keep full precision
fn row_values(row: &Row, metrics: &[String]) -> String {
    metrics
        .iter()
        .filter_map(|m| {
            row.get(m)
                .filter(|cell| !cell.is_empty())
                .map(|cell| format!("{m}={cell}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a multi-experiment lift table, plus the ranking when one was asked for
pub fn format_comparison(comparison: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Experiment comparison ({} experiments)",
        comparison.experiment_count
    );
    let _ = writeln!(out, "{}", "=".repeat(COMPARISON_RULE_WIDTH));

    let mut header = format!("{:>13}", "Experiment ID");
    for metric in &comparison.metric_columns {
        let _ = write!(header, "  {metric:>15}");
    }
    let _ = writeln!(out, "{header}");
    let _ = write!(out, "{}", "-".repeat(header.len()));

    for &experiment_id in &comparison.fetched_ids {
        let mut line = format!("{experiment_id:>13}");
        for metric in &comparison.metric_columns {
            let cell = comparison
                .first_lift(experiment_id, metric)
                .map(format_lift)
                .unwrap_or_else(|| MISSING_VALUE.to_string());
            let _ = write!(line, "  {cell:>15}");
        }
        if comparison.is_synthetic(experiment_id) {
            let _ = write!(line, "  {SYNTHETIC_MARK}");
        }
        let _ = write!(out, "\n{line}");
    }

    if !comparison.synthetic.is_empty() {
        let _ = write!(out, "\n\nSynthetic data used for:");
        for (experiment_id, reason) in &comparison.synthetic {
            let _ = write!(out, "\n  Experiment {experiment_id}: {reason}");
        }
    }

    if let Some(ranking) = &comparison.ranking {
        let _ = write!(out, "\n\nRanked by {}:", ranking.metric);
        for (position, entry) in ranking.entries.iter().enumerate() {
            let _ = write!(
                out,
                "\n  {}. Experiment {}: {}",
                position + 1,
                entry.experiment_id,
                format_lift(entry.lift)
            );
            if entry.source == DataSource::Synthetic {
                let _ = write!(out, " {SYNTHETIC_MARK}");
            }
        }
    }

    out
}
