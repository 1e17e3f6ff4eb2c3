//! `metrics` command implementation

use crate::query::{metric_description, DEFAULT_METRICS};
use anyhow::Result;

/// Print the default metric catalogue
pub fn run_metrics_command() -> Result<()> {
    println!("Default metrics:");
    for metric in DEFAULT_METRICS {
        println!("  {:<20} {}", metric, metric_description(metric));
    }
    Ok(())
}
