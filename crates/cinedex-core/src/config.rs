use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotate::DEFAULT_CALL_TIMEOUT;
use crate::error::AppError;
use crate::permit::{DEFAULT_PERMITS, MAX_PERMITS};
use crate::retry::{Jitter, RetryPolicy};

/// HTTP client configuration for external API calls.
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Environment variable overriding the permit pool size.
pub const ENV_CONCURRENCY: &str = "CINEDEX_CONCURRENCY";
/// Environment variable overriding the per-call deadline, in seconds.
pub const ENV_CALL_TIMEOUT: &str = "CINEDEX_CALL_TIMEOUT_SECS";
/// Environment variable overriding the attempt budget per item.
pub const ENV_MAX_ATTEMPTS: &str = "CINEDEX_MAX_ATTEMPTS";
/// Environment variable overriding the backoff ceiling, in seconds.
pub const ENV_MAX_BACKOFF: &str = "CINEDEX_MAX_BACKOFF_SECS";
/// Environment variable selecting the backoff jitter (`none`, `full` or a ratio).
pub const ENV_JITTER: &str = "CINEDEX_JITTER";

/// Enrichment pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Size of the permit pool bounding in-flight oracle calls.
    pub concurrency: usize,
    /// Deadline for each oracle attempt.
    pub call_timeout: Duration,
    /// Backoff and attempt budget for transient failures.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_PERMITS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads overrides from `CINEDEX_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but is not a positive
    /// integer, or if the concurrency exceeds what a permit pool can hold.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = parse_positive(&lookup, ENV_CONCURRENCY)? {
            config.concurrency = usize::try_from(n)
                .ok()
                .filter(|&n| n <= MAX_PERMITS)
                .ok_or_else(|| {
                    AppError::ConfigError(format!(
                        "{} must be at most {}, got {}",
                        ENV_CONCURRENCY, MAX_PERMITS, n
                    ))
                })?;
        }
        if let Some(secs) = parse_positive(&lookup, ENV_CALL_TIMEOUT)? {
            config.call_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_positive(&lookup, ENV_MAX_ATTEMPTS)? {
            config.retry = config.retry.with_max_attempts(n.min(u32::MAX as u64) as u32);
        }
        if let Some(secs) = parse_positive(&lookup, ENV_MAX_BACKOFF)? {
            config.retry = config.retry.with_max_delay(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(ENV_JITTER) {
            let jitter: Jitter = raw.parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "{} must be 'none', 'full' or a ratio in (0, 1], got '{}'",
                    ENV_JITTER, raw
                ))
            })?;
            config.retry = config.retry.with_jitter(jitter);
        }

        Ok(config)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_PERMITS);
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_positive<F>(lookup: &F, key: &str) -> Result<Option<u64>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(AppError::ConfigError(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

// =============================================================================
// Catalog Configuration (catalogs.toml)
// =============================================================================

fn default_enabled() -> bool {
    true
}

fn default_table() -> String {
    "Video_movies".to_string()
}

fn default_title_column() -> String {
    "canonicaltitle".to_string()
}

fn default_url_column() -> String {
    "url".to_string()
}

/// Root structure of catalogs.toml.
///
/// # Example
///
/// ```toml
/// [[catalogs]]
/// name = "commons-films"
/// url = "https://your-project.supabase.co"
/// table = "Video_movies"
/// title_column = "canonicaltitle"
///
/// [[catalogs]]
/// name = "genre-archive"
/// url = "https://your-project.supabase.co"
/// table = "Genre Data"
/// title_column = "title"
/// enabled = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogsConfig {
    #[serde(default)]
    pub catalogs: Vec<CatalogEntry>,
}

impl CatalogsConfig {
    /// Returns only enabled catalogs.
    pub fn enabled_catalogs(&self) -> Vec<&CatalogEntry> {
        self.catalogs.iter().filter(|c| c.enabled).collect()
    }

    /// Finds a catalog by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        self.catalogs
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A catalog table exposed over a PostgREST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Name used for `--catalog <name>` lookup and logging.
    pub name: String,

    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,

    /// Table listing the videos.
    #[serde(default = "default_table")]
    pub table: String,

    /// Column holding the (raw) video title.
    #[serde(default = "default_title_column")]
    pub title_column: String,

    /// Column holding the playable URL.
    #[serde(default = "default_url_column")]
    pub url_column: String,

    /// Unique column pages are ordered by. Defaults to `url_column`.
    #[serde(default)]
    pub order_column: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub description: Option<String>,
}

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "catalogs.toml";

/// Returns the default configuration directory: `~/.config/cinedex/`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cinedex"))
}

/// Returns the default configuration file path: `~/.config/cinedex/catalogs.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Cinedex Catalog Configuration
#
# Usage:
#   cinedex enrich                      # Enrich the first enabled catalog
#   cinedex enrich --catalog films      # Enrich a catalog by name
#   cinedex group --field language      # Group stored rows by a column
#
# The API key is read from SUPABASE_KEY and never stored here.

[[catalogs]]
name = "films"
url = "https://your-project.supabase.co"
table = "Video_movies"
title_column = "canonicaltitle"
url_column = "url"
description = "Open-licence feature films"
"#;

/// Loads catalog configuration from a TOML file.
///
/// # Returns
/// * `Ok(Some(config))` - configuration loaded
/// * `Ok(None)` - no configuration available at the default path
/// * `Err(e)` - file exists but is invalid, or a custom path does not exist
///
/// A template is written when the default path does not exist yet.
pub fn load_catalogs_config(path: Option<PathBuf>) -> Result<Option<CatalogsConfig>, AppError> {
    let using_default_path = path.is_none();
    let config_path = match path {
        Some(p) => p,
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(None),
        },
    };

    if !config_path.exists() {
        if !using_default_path {
            return Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }
        if let Err(e) = create_default_config(&config_path) {
            tracing::warn!("Could not create default config template: {}", e);
            return Ok(None);
        }
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    let config: CatalogsConfig = toml::from_str(&content).map_err(|e| {
        AppError::ConfigError(format!(
            "Invalid TOML in '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    Ok(Some(config))
}

fn create_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    tracing::info!("Created default config template at: {}", path.display());

    Ok(())
}
