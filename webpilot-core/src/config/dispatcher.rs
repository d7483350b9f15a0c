//! # Dispatcher Configuration

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// 默认最大并发数
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// 并发上限（防止同时打开过多浏览器会话）
pub const MAX_CONCURRENCY_LIMIT: usize = 64;

/// 并行调度器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// 最大并发数
    pub max_concurrency: usize,
    /// 单项超时时间，超时的条目记为失败
    pub item_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            item_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl DispatcherConfig {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }

        if self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(format!(
                "max_concurrency is too large (max: {})",
                MAX_CONCURRENCY_LIMIT
            ));
        }

        if matches!(self.item_timeout, Some(t) if t.is_zero()) {
            return Err("item_timeout must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = DispatcherConfig::default().with_max_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = DispatcherConfig::default().with_item_timeout(Some(Duration::ZERO));
        assert!(config.validate().is_err());

        let config = DispatcherConfig::default().with_item_timeout(None);
        assert!(config.validate().is_ok());
    }
}
