//! CLI argument structures
//!
//! This module defines the command-line interface of `ab-report`: the main
//! CLI structure and all subcommand definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fetch and compare A/B experiment summaries
#[derive(Parser, Debug)]
#[command(name = "ab-report")]
#[command(about = "ab-report - Fetch, aggregate and compare A/B experiment results", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to the user config dir, then ./.ab-report.toml)
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the summary of one experiment
    #[command(name = "fetch")]
    Fetch(FetchArgs),

    /// Compare the lifts of several experiments
    #[command(name = "compare")]
    Compare(CompareArgs),

    /// List the default metrics
    #[command(name = "metrics")]
    Metrics,

    /// Manage the local result cache
    #[command(name = "cache")]
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Experiment ID
    pub experiment_id: i64,

    /// Project ID (defaults to AB_PROJECT_ID, then 27)
    pub project_id: Option<i64>,

    /// Metrics to query, comma separated
    #[arg(long, value_name = "LIST")]
    pub metrics: Option<String>,

    /// Control group selector
    #[arg(long)]
    pub control: Option<String>,

    /// Treatment group selectors, comma separated
    #[arg(long, value_name = "LIST")]
    pub treatments: Option<String>,

    /// Date range as `start,end` (YYYY-MM-DD); defaults to the last 14 days
    #[arg(long, value_name = "START,END")]
    pub dates: Option<String>,

    /// Regions to include, comma separated
    #[arg(long, value_name = "LIST")]
    pub regions: Option<String>,

    /// Breakdown dimensions, comma separated
    #[arg(long, value_name = "LIST")]
    pub dims: Option<String>,

    /// Normalization mode
    #[arg(long)]
    pub normalization: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip the local cache and ask the service to recompute
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CompareArgs {
    /// Experiment IDs, comma separated (at least two)
    #[arg(value_name = "IDS")]
    pub experiment_ids: String,

    /// Project ID (defaults to AB_PROJECT_ID, then 27)
    #[arg(long)]
    pub project_id: Option<i64>,

    /// Metrics to compare, comma separated
    #[arg(long, value_name = "LIST")]
    pub metrics: Option<String>,

    /// Rank the experiments by the lift of this metric
    #[arg(long, value_name = "METRIC")]
    pub sort_by: Option<String>,

    /// Date range as `start,end` (YYYY-MM-DD)
    #[arg(long, value_name = "START,END")]
    pub dates: Option<String>,

    /// Regions to include, comma separated
    #[arg(long, value_name = "LIST")]
    pub regions: Option<String>,

    /// Print the comparison as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCommands {
    /// Remove every cached result
    Clear,
    /// Show the number and size of cached results
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_arguments() {
        let cli = Cli::try_parse_from([
            "ab-report",
            "-vv",
            "fetch",
            "1001",
            "30",
            "--metrics",
            "gmv,ctr",
            "--dates",
            "2024-01-01,2024-01-14",
            "--json",
            "--no-cache",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Some(Commands::Fetch(args)) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.experiment_id, 1001);
        assert_eq!(args.project_id, Some(30));
        assert_eq!(args.metrics.as_deref(), Some("gmv,ctr"));
        assert!(args.json);
        assert!(args.no_cache);
    }

    #[test]
    fn test_compare_arguments() {
        let cli = Cli::try_parse_from([
            "ab-report",
            "compare",
            "1,2,3",
            "--sort-by",
            "gmv",
            "--config",
            "ab.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("ab.toml")));
        let Some(Commands::Compare(args)) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.experiment_ids, "1,2,3");
        assert_eq!(args.sort_by.as_deref(), Some("gmv"));
    }

    #[test]
    fn test_cache_subcommands() {
        let cli = Cli::try_parse_from(["ab-report", "cache", "stats"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Cache {
                command: CacheCommands::Stats
            })
        ));
    }

    #[test]
    fn test_non_numeric_experiment_is_rejected() {
        assert!(Cli::try_parse_from(["ab-report", "fetch", "abc"]).is_err());
    }
}
