//! `cache` command implementation

use crate::cache::{CacheStore, FileCache};
use crate::cli::args::CacheCommands;
use crate::config::ReportConfig;
use anyhow::{Context, Result};

/// Execute a cache subcommand against the configured cache directory
pub fn run_cache_command(command: CacheCommands, config: &ReportConfig) -> Result<()> {
    let dir = config.cache.resolved_dir();
    let cache = FileCache::with_ttl(dir.clone(), config.cache.ttl)
        .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;

    match command {
        CacheCommands::Clear => {
            let removed = cache.clear()?;
            println!("Removed {} cached result(s) from {}", removed, dir.display());
        }
        CacheCommands::Stats => {
            let stats = cache.stats()?;
            println!("Cache directory: {}", dir.display());
            println!("Entries: {}", stats.entries);
            println!("Size: {} bytes", stats.total_bytes);
            println!("TTL: {}s", config.cache.ttl.as_secs());
        }
    }
    Ok(())
}
