//! Configuration for the report pipeline
//!
//! [`ReportConfig`] is built once at startup and handed to every component
//! constructor; nothing reads the environment after that. Values are layered
//! with increasing precedence:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, else `<config dir>/config.toml`, else `.ab-report.toml`)
//! 3. `AB_*` environment variables

use crate::cache::DEFAULT_TTL;
use crate::error::{Error, Result};
use crate::poll::PollPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PROJECT_ID: i64 = 27;
const LOCAL_CONFIG_FILE: &str = ".ab-report.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ab-report", "ab-report")
}

/// Which deployment of the AB report gateway to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiEnvironment {
    #[default]
    Live,
    Staging,
    Test,
}

impl ApiEnvironment {
    /// Unknown names map to the test gateway
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "live" => Self::Live,
            "staging" => Self::Staging,
            _ => Self::Test,
        }
    }

    pub fn gateway_url(self) -> &'static str {
        match self {
            Self::Live => "https://httpgateway.abtest.shopee.io/request_spex",
            Self::Staging => "https://httpgateway.abtest.staging.shopee.io/request_spex",
            Self::Test => "https://httpgateway.abtest.test.shopee.io/request_spex",
        }
    }
}

/// Remote service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub env: ApiEnvironment,
    /// Overrides the gateway URL derived from `env`
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub client_server_name: String,
    pub operator: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Force synthetic data even when a token is configured
    pub use_mock: bool,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            env: ApiEnvironment::default(),
            api_url: None,
            token: None,
            client_server_name: String::new(),
            operator: String::new(),
            timeout: Duration::from_secs(30),
            use_mock: false,
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 30,
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.env.gateway_url())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Synthetic data is served when no credential is set or mock mode is forced
    pub fn mock_mode(&self) -> bool {
        self.use_mock || self.token().is_none()
    }
}

/// Local result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheSettings {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".cache"))
        })
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub default_project_id: i64,
    pub api: ApiConfig,
    pub cache: CacheSettings,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_project_id: DEFAULT_PROJECT_ID,
            api: ApiConfig::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl ReportConfig {
    /// Load defaults, then the config file, then environment overrides
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate_file(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn locate_file(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let candidates = project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .into_iter()
            .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE)));

        Ok(candidates.into_iter().find(|p| p.exists()))
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env(|name| std::env::var(name).ok());
    }

    /// Apply `AB_*` overrides read through `lookup`
    pub fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(env) = lookup("AB_API_ENV") {
            self.api.env = ApiEnvironment::from_name(&env);
        }
        if let Some(url) = lookup("AB_API_URL") {
            self.api.api_url = Some(url);
        }
        if let Some(token) = lookup("AB_API_TOKEN") {
            self.api.token = Some(token.trim().to_string());
        }
        if let Some(name) = lookup("AB_CLIENT_SERVER_NAME") {
            self.api.client_server_name = name.trim().to_string();
        }
        if let Some(operator) = lookup("AB_OPERATOR") {
            self.api.operator = operator.trim().to_string();
        }
        if let Some(secs) = parse_env::<u64>(&lookup, "AB_API_TIMEOUT") {
            self.api.timeout = Duration::from_secs(secs);
        }
        if let Some(mock) = lookup("USE_MOCK_DATA") {
            self.api.use_mock = mock.trim().eq_ignore_ascii_case("true");
        }
        if let Some(secs) = parse_env::<u64>(&lookup, "AB_POLL_INTERVAL") {
            self.api.poll_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env::<u32>(&lookup, "AB_MAX_POLL_ATTEMPTS") {
            self.api.max_poll_attempts = attempts;
        }
        if let Some(project_id) = parse_env::<i64>(&lookup, "AB_PROJECT_ID") {
            self.default_project_id = project_id;
        }
        if let Some(dir) = lookup("AB_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = parse_env::<u64>(&lookup, "AB_CACHE_TTL") {
            self.cache.ttl = Duration::from_secs(secs);
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.api.max_poll_attempts, self.api.poll_interval)
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}
