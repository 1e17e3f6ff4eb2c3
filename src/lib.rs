//! # ab-report
//!
//! Retrieve A/B experiment summaries from the AB report service, cache them
//! locally, and turn the flat result table into per-group metrics with lift
//! against the control group.
//!
//! ## Usage
//!
//! ```bash
//! ab-report fetch <experiment_id> [project_id] [--metrics a,b] [--json]
//! ab-report compare <id1,id2,...> [--sort-by metric]
//! ```
//!
//! ## Modules
//!
//! - `query` - Immutable query parameters and cache key derivation
//! - `cache` - TTL result cache with file and in-memory stores
//! - `client` - Two-phase submit/poll client, live and synthetic
//! - `poll` - Bounded polling state machine
//! - `parser` - Normalization of summary payloads into a `RawTable`
//! - `aggregate` - Grouping, metric sums, and lift computation
//! - `report` - Plain-text rendering
//! - `compare` - Multi-experiment lift comparison
//! - `pipeline` - Cache, query, and fallback orchestration
//! - `config` - Layered configuration (defaults, TOML file, environment)
//! - `app` - Logging setup and fatal error handling
//! - `cli` - Command-line interface
pub mod aggregate;
pub mod app;
pub mod cache;
pub mod cli;
pub mod client;
pub mod compare;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod poll;
pub mod query;
pub mod report;

pub use error::{Error, Result};
pub use pipeline::{DataSource, ExperimentReport, ReportService};
pub use query::QueryParams;
