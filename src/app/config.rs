//! Application configuration
//!
//! Settings that only concern the process itself. Report settings live in
//! [`crate::config::ReportConfig`].

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self { verbose }
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn,ab_report=info",
            1 => "info,ab_report=debug",
            2 => "debug,ab_report=trace",
            _ => "trace,hyper=debug,reqwest=debug",
        }
    }
}
