//! # Configuration Loader
//!
//! Loads and merges configuration from multiple sources:
//! 1. Default values (lowest priority)
//! 2. Configuration file (middle priority)
//! 3. Environment variables (highest priority)
//!
//! The named profile, wherever it was set, is applied last.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::error::{Result, WebPilotError};
use crate::profile::ProfileSelector;

const DEFAULT_ENV_PREFIX: &str = "WEBPILOT";

/// Configuration loader with support for file and environment variable overrides
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Path to configuration file
    config_path: PathBuf,

    /// Environment variable prefix
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }
}

impl ConfigLoader {
    /// Create a new config loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config loader with a specific config file path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Create a config loader with custom environment prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: prefix.into(),
        }
    }

    /// Replace the environment prefix, keeping the path
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Path that [`ConfigLoader::load`] reads
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the default configuration file path
    fn default_config_path() -> PathBuf {
        if let Ok(config_path) = env::var("WEBPILOT_CONFIG") {
            return PathBuf::from(config_path);
        }

        let mut possible_paths = vec![PathBuf::from("webpilot.toml")];
        if let Some(dir) = dirs::config_dir() {
            possible_paths.push(dir.join("webpilot").join("config.toml"));
        }

        for path in &possible_paths {
            if path.exists() {
                return path.clone();
            }
        }

        // Return the first path if none exist
        possible_paths.swap_remove(0)
    }

    /// Load configuration with full hierarchy
    pub fn load(&self) -> Result<Config> {
        let mut config = Config::default();

        if self.config_path.exists() {
            let file_config = self.load_from_file()?;
            config = merge_file_config(config, file_config);
        } else {
            tracing::debug!(
                path = %self.config_path.display(),
                "Config file not found, using defaults"
            );
        }

        config = self.merge_env_config(config)?;

        if let Some(name) = config.profile.clone() {
            let profile = ProfileSelector::select(&name)?;
            config.apply_profile(&profile);
        }

        config.validate().map_err(|e| match e {
            WebPilotError::UnknownProfile(_) => e,
            other => WebPilotError::configuration(format!(
                "Configuration validation failed: {}",
                other
            )),
        })?;

        tracing::debug!(
            path = %self.config_path.display(),
            profile = ?config.profile,
            max_entries = config.cache.max_entries,
            max_concurrency = config.dispatcher.max_concurrency,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from file
    fn load_from_file(&self) -> Result<FileConfig> {
        let content = std::fs::read_to_string(&self.config_path).map_err(|e| {
            tracing::warn!(
                path = %self.config_path.display(),
                error = %e,
                "Failed to read config file"
            );
            WebPilotError::Io(e)
        })?;

        toml::from_str(&content).map_err(|e| {
            WebPilotError::configuration(format!(
                "Failed to parse config file '{}': {}",
                self.config_path.display(),
                e
            ))
        })
    }

    /// Merge environment variables into configuration
    fn merge_env_config(&self, mut config: Config) -> Result<Config> {
        let prefix = &self.env_prefix;

        if let Ok(val) = env::var(format!("{}_PROFILE", prefix)) {
            config.profile = Some(val);
        }

        // Cache environment variables
        if let Ok(val) = env::var(format!("{}_CACHE_ENABLED", prefix)) {
            config.cache.enabled = parse_bool(&val, "CACHE_ENABLED")?;
        }
        if let Ok(val) = env::var(format!("{}_CACHE_MAX_ENTRIES", prefix)) {
            config.cache.max_entries = parse_usize(&val, "CACHE_MAX_ENTRIES")?;
        }
        if let Ok(val) = env::var(format!("{}_CACHE_TTL_SECS", prefix)) {
            config.cache.default_ttl = Duration::from_secs(parse_u64(&val, "CACHE_TTL_SECS")?);
        }
        if let Ok(val) = env::var(format!("{}_CACHE_KEY_PREFIX", prefix)) {
            config.cache.key_prefix = Some(val);
        }
        if let Ok(val) = env::var(format!("{}_CACHE_METRICS", prefix)) {
            config.cache.enable_metrics = parse_bool(&val, "CACHE_METRICS")?;
        }

        // Dispatcher environment variables
        if let Ok(val) = env::var(format!("{}_MAX_CONCURRENCY", prefix)) {
            config.dispatcher.max_concurrency = parse_usize(&val, "MAX_CONCURRENCY")?;
        }
        if let Ok(val) = env::var(format!("{}_ITEM_TIMEOUT_SECS", prefix)) {
            // 0 disables the per-item deadline
            let secs = parse_u64(&val, "ITEM_TIMEOUT_SECS")?;
            config.dispatcher.item_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// Merge file configuration into base configuration
fn merge_file_config(mut base: Config, file: FileConfig) -> Config {
    if let Some(profile) = file.profile {
        base.profile = Some(profile);
    }

    if let Some(cache) = file.cache {
        if let Some(enabled) = cache.enabled {
            base.cache.enabled = enabled;
        }
        if let Some(max) = cache.max_entries {
            base.cache.max_entries = max;
        }
        if let Some(ttl) = cache.default_ttl_secs {
            base.cache.default_ttl = Duration::from_secs(ttl);
        }
        if let Some(prefix) = cache.key_prefix {
            base.cache.key_prefix = Some(prefix);
        }
        if let Some(metrics) = cache.enable_metrics {
            base.cache.enable_metrics = metrics;
        }
    }

    if let Some(dispatcher) = file.dispatcher {
        if let Some(max) = dispatcher.max_concurrency {
            base.dispatcher.max_concurrency = max;
        }
        if let Some(secs) = dispatcher.item_timeout_secs {
            base.dispatcher.item_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
    }

    base
}

/// Parse a u64 from string
fn parse_u64(s: &str, name: &str) -> Result<u64> {
    s.parse::<u64>().map_err(|e| {
        WebPilotError::configuration(format!(
            "Invalid {} '{}': must be a valid number. Error: {}",
            name, s, e
        ))
    })
}

/// Parse a usize from string
fn parse_usize(s: &str, name: &str) -> Result<usize> {
    s.parse::<usize>().map_err(|e| {
        WebPilotError::configuration(format!(
            "Invalid {} '{}': must be a valid number. Error: {}",
            name, s, e
        ))
    })
}

/// Parse a boolean from string
fn parse_bool(s: &str, name: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(WebPilotError::configuration(format!(
            "Invalid {} '{}': must be 'true' or 'false'",
            name, s
        ))),
    }
}

/// Configuration structure for file-based config
/// Uses Option for all fields to allow partial configuration
#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    cache: Option<FileCacheConfig>,
    #[serde(default)]
    dispatcher: Option<FileDispatcherConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileCacheConfig {
    enabled: Option<bool>,
    max_entries: Option<usize>,
    default_ttl_secs: Option<u64>,
    key_prefix: Option<String>,
    enable_metrics: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileDispatcherConfig {
    max_concurrency: Option<usize>,
    item_timeout_secs: Option<u64>,
}
