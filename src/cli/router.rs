//! Command routing and execution
//!
//! This module routes parsed CLI commands to their implementations.

use crate::cli::args::Commands;
use crate::cli::commands::*;
use crate::config::ReportConfig;
use anyhow::Result;
use clap::CommandFactory;
use std::path::Path;
use tracing::debug;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Option<Commands>, config_path: Option<&Path>) -> Result<()> {
    let Some(command) = command else {
        // No command provided, show help
        crate::cli::args::Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Metrics = command {
        return run_metrics_command();
    }

    let config = ReportConfig::load(config_path)?;
    debug!(
        "Using endpoint {} (mock mode: {})",
        config.api.endpoint(),
        config.api.mock_mode()
    );

    match command {
        Commands::Fetch(args) => run_fetch_command(args, &config).await,
        Commands::Compare(args) => run_compare_command(args, &config).await,
        Commands::Cache { command } => run_cache_command(command, &config),
        Commands::Metrics => run_metrics_command(),
    }
}
