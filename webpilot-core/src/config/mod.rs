//! # WebPilot Configuration
//!
//! ## Configuration Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Environment Variables          │
//! │    WEBPILOT_CACHE_MAX_ENTRIES=2000      │
//! ├─────────────────────────────────────────┤
//! │         Config File (webpilot.toml)     │
//! │    [cache]                              │
//! │    max_entries = 2000                   │
//! ├─────────────────────────────────────────┤
//! │         Default Values                  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A named `profile` is applied on top of the merged values: it sets the
//! default TTL and the dispatcher concurrency. Whether reads go through the
//! cache at all is decided per profile by the optimizer, so `[cache] enabled`
//! only ever reflects the file and environment. A store built under
//! `accuracy` can still cache after switching to `speed`.

use serde::{Deserialize, Serialize};

mod cache;
mod dispatcher;
mod loader;

pub use cache::{CacheConfig, MAX_CACHE_ENTRIES, MAX_CACHE_TTL};
pub use dispatcher::{DispatcherConfig, DEFAULT_MAX_CONCURRENCY, MAX_CONCURRENCY_LIMIT};
pub use loader::ConfigLoader;

use webpilot_types::OptimizationProfile;

use crate::error::{Result, WebPilotError};
use crate::profile::ProfileSelector;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Optional optimization preset name
    pub profile: Option<String>,
    pub cache: CacheConfig,
    pub dispatcher: DispatcherConfig,
}

impl Config {
    /// Validate every section, including the profile name
    pub fn validate(&self) -> Result<()> {
        self.cache
            .validate()
            .map_err(|e| WebPilotError::configuration(format!("[cache] {}", e)))?;
        self.dispatcher
            .validate()
            .map_err(|e| WebPilotError::configuration(format!("[dispatcher] {}", e)))?;
        self.active_profile()?;
        Ok(())
    }

    /// Resolve the configured profile name, if any
    pub fn active_profile(&self) -> Result<Option<OptimizationProfile>> {
        self.profile
            .as_deref()
            .map(ProfileSelector::select)
            .transpose()
    }

    /// Overwrite TTL and concurrency settings with the profile's values
    pub fn apply_profile(&mut self, profile: &OptimizationProfile) {
        if profile.cache_enabled {
            self.cache.default_ttl = profile.cache_ttl;
        }
        self.dispatcher.max_concurrency = profile.max_concurrency;
        self.profile = Some(profile.name.as_str().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default().active_profile().unwrap().is_none());
    }

    #[test]
    fn test_unknown_profile_fails_validation() {
        let config = Config {
            profile: Some("turbo".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WebPilotError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_apply_accuracy_keeps_ttl_valid() {
        let mut config = Config::default();
        let profile = ProfileSelector::select("accuracy").unwrap();
        config.apply_profile(&profile);

        // 存储保持启用，是否走缓存由优化器按预设决定
        assert!(config.cache.enabled);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.dispatcher.max_concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_batch_profile() {
        let mut config = Config::default();
        let profile = ProfileSelector::select("batch").unwrap();
        config.apply_profile(&profile);

        assert!(config.cache.enabled);
        assert_eq!(config.cache.default_ttl, profile.cache_ttl);
        assert_eq!(config.dispatcher.max_concurrency, profile.max_concurrency);
        assert_eq!(config.profile.as_deref(), Some("batch"));
    }
}
