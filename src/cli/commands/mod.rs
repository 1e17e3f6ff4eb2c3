//! Command implementation modules
//!
//! Each subcommand lives in its own module.

pub mod cache;
pub mod compare;
pub mod fetch;
pub mod metrics;

pub use cache::run_cache_command;
pub use compare::run_compare_command;
pub use fetch::run_fetch_command;
pub use metrics::run_metrics_command;
