//! Configuration types for doc-extractor

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable naming a JSON config file
pub const ENV_CONFIG_FILE: &str = "DOC_EXTRACTOR_CONFIG";
/// Override for [`StorageConfig::scratch_dir`]
pub const ENV_SCRATCH_DIR: &str = "DOC_EXTRACTOR_SCRATCH_DIR";
/// Override for [`FetchConfig::timeout`], in seconds
pub const ENV_FETCH_TIMEOUT_SECS: &str = "DOC_EXTRACTOR_FETCH_TIMEOUT_SECS";
/// Override for [`FetchConfig::max_archive_bytes`]
pub const ENV_MAX_ARCHIVE_BYTES: &str = "DOC_EXTRACTOR_MAX_ARCHIVE_BYTES";
/// Override for [`ApiConfig::bind_address`]
pub const ENV_BIND_ADDRESS: &str = "DOC_EXTRACTOR_BIND_ADDRESS";
/// Override for [`RunnerConfig::max_concurrent_jobs`]
pub const ENV_MAX_CONCURRENT_JOBS: &str = "DOC_EXTRACTOR_MAX_CONCURRENT_JOBS";
/// Override for [`ApiConfig::cors_origins`] (comma separated)
pub const ENV_CORS_ORIGINS: &str = "DOC_EXTRACTOR_CORS_ORIGINS";

/// Main configuration for [`DocumentExtractor`](crate::DocumentExtractor)
///
/// Fields are organized into logical sub-configs:
/// - [`StorageConfig`]: scratch workspaces and cleanup
/// - [`FetchConfig`]: archive download limits
/// - [`ExtractionConfig`]: nested archive handling
/// - [`ConversionConfig`]: text-to-PDF layout
/// - [`RunnerConfig`]: job concurrency
/// - [`ApiConfig`]: REST API server
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Scratch workspace settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fetcher settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Archive extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Conversion layout settings
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Job runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Scratch workspace configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Root of per-task workspaces (default: "./scratch")
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Remove the archive and extracted tree once a task finishes (default: true)
    ///
    /// On failure the whole workspace is removed.
    #[serde(default = "default_true")]
    pub cleanup_intermediate: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            cleanup_intermediate: true,
        }
    }
}

/// Archive download configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Total request timeout (default: 60 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// Connection timeout (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub connect_timeout: Duration,

    /// Largest archive accepted, in bytes (default: 512 MiB)
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            max_archive_bytes: default_max_archive_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

/// Archive extraction configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtractionConfig {
    /// Maximum depth for nested archive extraction (default: 2)
    #[serde(default = "default_max_recursion")]
    pub max_recursion_depth: u32,

    /// File extensions treated as nested archives
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_recursion(),
            archive_extensions: default_archive_extensions(),
        }
    }
}

/// Layout used when rendering text into PDF pages
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversionConfig {
    /// Characters per line before wrapping (default: 90)
    #[serde(default = "default_text_line_width")]
    pub text_line_width: usize,

    /// Lines per page (default: 60)
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,

    /// Font size in points (default: 10)
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            text_line_width: default_text_line_width(),
            lines_per_page: default_lines_per_page(),
            font_size: default_font_size(),
        }
    }
}

/// Job runner configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RunnerConfig {
    /// Jobs allowed to run stages at once (default: 4)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: Some(ENV_CONFIG_FILE.to_string()),
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: Some(ENV_CONFIG_FILE.to_string()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment
    ///
    /// Starts from the file named by `DOC_EXTRACTOR_CONFIG` (or defaults) and
    /// applies the `DOC_EXTRACTOR_*` overrides on top.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) if !path.trim().is_empty() => Self::load(path.trim())?,
            _ => Config::default(),
        };

        if let Some(dir) = non_empty(lookup(ENV_SCRATCH_DIR)) {
            config.storage.scratch_dir = PathBuf::from(dir);
        }
        if let Some(raw) = non_empty(lookup(ENV_FETCH_TIMEOUT_SECS)) {
            config.fetch.timeout = Duration::from_secs(parse_var(ENV_FETCH_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = non_empty(lookup(ENV_MAX_ARCHIVE_BYTES)) {
            config.fetch.max_archive_bytes = parse_var(ENV_MAX_ARCHIVE_BYTES, &raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_BIND_ADDRESS)) {
            config.api.bind_address = parse_var(ENV_BIND_ADDRESS, &raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_MAX_CONCURRENT_JOBS)) {
            config.runner.max_concurrent_jobs = parse_var(ENV_MAX_CONCURRENT_JOBS, &raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_CORS_ORIGINS)) {
            config.api.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runner cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout.is_zero() {
            return Err(config_error("fetch.timeout must be greater than zero", ENV_FETCH_TIMEOUT_SECS));
        }
        if self.fetch.connect_timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch.connect_timeout must be greater than zero".into(),
                key: None,
            });
        }
        if self.fetch.max_archive_bytes == 0 {
            return Err(config_error(
                "fetch.max_archive_bytes must be greater than zero",
                ENV_MAX_ARCHIVE_BYTES,
            ));
        }
        if self.runner.max_concurrent_jobs == 0 {
            return Err(config_error(
                "runner.max_concurrent_jobs must be greater than zero",
                ENV_MAX_CONCURRENT_JOBS,
            ));
        }
        if self.conversion.text_line_width == 0
            || self.conversion.lines_per_page == 0
            || self.conversion.font_size == 0
        {
            return Err(Error::Config {
                message: "conversion layout values must be greater than zero".into(),
                key: None,
            });
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value '{}' for {}: {}", raw, key, e),
        key: Some(key.to_string()),
    })
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

// Default value functions
fn default_scratch_dir() -> PathBuf {
    PathBuf::from("./scratch")
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_archive_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_user_agent() -> String {
    format!("doc-extractor/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_recursion() -> u32 {
    2
}

fn default_archive_extensions() -> Vec<String> {
    vec![
        "zip".into(),
        "tar".into(),
        "gz".into(),
        "tgz".into(),
        "7z".into(),
        "rar".into(),
    ]
}

fn default_text_line_width() -> usize {
    90
}

fn default_lines_per_page() -> usize {
    60
}

fn default_font_size() -> u32 {
    10
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
