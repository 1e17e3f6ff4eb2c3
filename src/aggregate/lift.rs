//! Lift of treatment groups against control

use super::{
    metric_columns, parse_number, ExperimentGroup, MetricValues, OverallTreatment, LABEL_COLUMNS,
    VARIANT_COLUMN,
};
use crate::parser::{RawTable, Row};
use std::collections::BTreeMap;

/// Relative change per metric, `(treatment - control) / control`
pub type LiftResult = BTreeMap<String, f64>;

/// Lift of `treatment` over `control` for each metric
///
/// A zero or missing control value yields exactly 0.0. A metric the treatment
/// lacks while the control has a usable value is left out.
pub fn compute_lift(
    treatment: &MetricValues,
    control: &MetricValues,
    metric_columns: &[String],
) -> LiftResult {
    metric_columns
        .iter()
        .filter_map(|metric| {
            let lift = match control.get(metric) {
                Some(&c) if c != 0.0 => {
                    let t = treatment.get(metric)?;
                    (t - c) / c
                }
                _ => 0.0,
            };
            Some((metric.clone(), lift))
        })
        .collect()
}

/// Sum every treatment group and compare the total with the control group
///
/// Only produced when both a control and at least one treatment exist.
pub fn overall_treatment(
    groups: &[ExperimentGroup],
    metric_columns: &[String],
) -> Option<OverallTreatment> {
    let control = groups.iter().find(|g| g.is_control)?;
    let treatments: Vec<&ExperimentGroup> = groups.iter().filter(|g| !g.is_control).collect();
    if treatments.is_empty() {
        return None;
    }

    let mut aggregate = MetricValues::new();
    for group in &treatments {
        for (metric, value) in &group.aggregate {
            *aggregate.entry(metric.clone()).or_insert(0.0) += value;
        }
    }

    let lift = compute_lift(&aggregate, &control.aggregate, metric_columns);
    Some(OverallTreatment {
        groups: treatments.iter().map(|g| g.group_key.clone()).collect(),
        aggregate,
        lift,
    })
}

/// Name of the group a `relative` row belongs to
///
/// The label when present, else the variant id, else `Unknown`.
pub fn lift_group_label(row: &Row) -> &str {
    LABEL_COLUMNS
        .iter()
        .chain(std::iter::once(&VARIANT_COLUMN))
        .find_map(|c| row.get(*c).filter(|s| !s.is_empty()))
        .map(String::as_str)
        .unwrap_or("Unknown")
}

/// Server-reported relative lifts per non-control group
///
/// Read from the `relative` rows, keyed by [`lift_group_label`]. Cells that
/// are not numbers are skipped.
pub fn extract_metric_lifts(table: &RawTable) -> BTreeMap<String, LiftResult> {
    let metrics = metric_columns(&table.columns);
    let mut lifts = BTreeMap::new();

    for row in &table.relative {
        let group = lift_group_label(row);
        if group.to_lowercase().contains("control") {
            continue;
        }

        let values: LiftResult = metrics
            .iter()
            .filter_map(|m| Some((m.clone(), parse_number(row.get(m)?)?)))
            .collect();
        if !values.is_empty() {
            lifts.insert(group.to_string(), values);
        }
    }
    lifts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::group_rows;
    use crate::parser::Row;

    fn values(pairs: &[(&str, f64)]) -> MetricValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lift_ratio() {
        let lift = compute_lift(
            &values(&[("gmv", 1100.0)]),
            &values(&[("gmv", 1000.0)]),
            &strings(&["gmv"]),
        );
        assert!((lift["gmv"] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_or_absent_control_gives_zero_lift() {
        let metrics = strings(&["gmv", "ctr", "orders"]);
        let lift = compute_lift(
            &values(&[("gmv", 50.0), ("ctr", 0.2), ("orders", 3.0)]),
            &values(&[("gmv", 0.0)]),
            &metrics,
        );
        assert_eq!(lift["gmv"], 0.0);
        assert_eq!(lift["ctr"], 0.0);
        assert_eq!(lift["orders"], 0.0);
        assert!(lift.values().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_missing_treatment_metric_is_omitted() {
        let lift = compute_lift(
            &values(&[]),
            &values(&[("gmv", 10.0)]),
            &strings(&["gmv"]),
        );
        assert!(lift.is_empty());
    }

    #[test]
    fn test_negative_lift() {
        let lift = compute_lift(
            &values(&[("gmv", 90.0)]),
            &values(&[("gmv", 100.0)]),
            &strings(&["gmv"]),
        );
        assert!((lift["gmv"] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_overall_treatment_sums_treatments() {
        let body = vec![
            row(&[("group_name", "control"), ("gmv", "100")]),
            row(&[("group_name", "treatment a"), ("gmv", "60")]),
            row(&[("group_name", "treatment b"), ("gmv", "70")]),
        ];
        let metrics = strings(&["gmv"]);
        let groups = group_rows(&body, &metrics);
        let overall = overall_treatment(&groups, &metrics).unwrap();

        assert_eq!(overall.groups, strings(&["treatment b", "treatment a"]));
        assert_eq!(overall.aggregate["gmv"], 130.0);
        assert!((overall.lift["gmv"] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_overall_treatment_with_zero_control() {
        let body = vec![
            row(&[("group_name", "control"), ("gmv", "0")]),
            row(&[("group_name", "treatment"), ("gmv", "70")]),
        ];
        let metrics = strings(&["gmv"]);
        let overall = overall_treatment(&group_rows(&body, &metrics), &metrics).unwrap();
        assert_eq!(overall.lift["gmv"], 0.0);
    }

    #[test]
    fn test_overall_treatment_requires_both_sides() {
        let metrics = strings(&["gmv"]);
        let only_control = group_rows(&[row(&[("group_name", "control"), ("gmv", "1")])], &metrics);
        assert!(overall_treatment(&only_control, &metrics).is_none());

        let only_treatment = group_rows(&[row(&[("group_name", "b"), ("gmv", "1")])], &metrics);
        assert!(overall_treatment(&only_treatment, &metrics).is_none());
    }

    #[test]
    fn test_extract_metric_lifts_skips_control() {
        let table = RawTable {
            columns: strings(&["group_prefix", "ctr", "note"]),
            relative: vec![
                row(&[("group_prefix", "Control Group"), ("ctr", "0.0")]),
                row(&[("group_prefix", "Treatment Group"), ("ctr", "0.133333"), ("note", "-")]),
                row(&[("group_prefix", "Empty"), ("ctr", "n/a")]),
            ],
            ..Default::default()
        };
        let lifts = extract_metric_lifts(&table);

        assert_eq!(lifts.len(), 1);
        assert_eq!(lifts["Treatment Group"]["ctr"], 0.133333);
        assert!(!lifts["Treatment Group"].contains_key("note"));
    }

    #[test]
    fn test_extract_metric_lifts_by_variant_id() {
        let table = RawTable {
            columns: strings(&["abtest_group", "gmv"]),
            relative: vec![row(&[("abtest_group", "82931"), ("gmv", "0.02")])],
            ..Default::default()
        };
        let lifts = extract_metric_lifts(&table);
        assert_eq!(lifts["82931"]["gmv"], 0.02);
    }
}
