//! Normalization of the summary payload into a [`RawTable`]
//!
//! The service sends rows either as JSON objects or as `"||"`-joined strings
//! positioned against the header. Both shapes become a [`Row`] here so that
//! nothing downstream needs to know which one arrived.

use crate::client::SummaryResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

pub const FIELD_DELIMITER: &str = "||";

/// One table row, column name to cell text
pub type Row = BTreeMap<String, String>;

/// Normalized summary table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub body: Vec<Row>,
    pub relative: Vec<Row>,
    pub control_group_indexes: Vec<usize>,
    /// The payload exactly as received
    #[serde(default)]
    pub raw: Value,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Parse the `data` payload of a response, if it has one
pub fn parse(response: &SummaryResponse) -> Option<RawTable> {
    response.data.as_ref().map(parse_data)
}

/// Parse a `data` payload
pub fn parse_data(data: &Value) -> RawTable {
    let columns = discover_columns(data);
    let rows = |field: &str| -> Vec<Row> {
        data.get(field)
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(|r| normalize_row(r, &columns)).collect())
            .unwrap_or_default()
    };

    let body = rows("body");
    let relative = rows("relative");
    let control_group_indexes = data
        .get("control_group_indexes")
        .and_then(Value::as_array)
        .map(|idx| {
            idx.iter()
                .filter_map(Value::as_u64)
                .map(|i| i as usize)
                .collect()
        })
        .unwrap_or_default();

    RawTable {
        columns,
        body,
        relative,
        control_group_indexes,
        raw: data.clone(),
    }
}

/// Split a delimited line into trimmed fields
pub fn split_fields(line: &str) -> Vec<String> {
    line.split(FIELD_DELIMITER)
        .map(|field| field.trim().to_string())
        .collect()
}

fn discover_columns(data: &Value) -> Vec<String> {
    if let Some(columns) = data.get("columns").and_then(Value::as_array) {
        return columns.iter().map(cell_text).collect();
    }

    match data.get("header") {
        Some(Value::String(header)) if !header.is_empty() => split_fields(header),
        Some(Value::Array(header)) => header.iter().map(cell_text).collect(),
        _ => Vec::new(),
    }
}

fn normalize_row(row: &Value, columns: &[String]) -> Option<Row> {
    match row {
        Value::Object(map) => Some(
            map.iter()
                .map(|(name, value)| (name.clone(), cell_text(value)))
                .collect(),
        ),
        Value::String(line) => Some(
            columns
                .iter()
                .cloned()
                .zip(split_fields(line))
                .collect(),
        ),
        other => {
            trace!("Skipping row of unexpected shape: {}", other);
            None
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
