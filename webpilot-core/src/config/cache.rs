//! # 自动化结果缓存配置
//!
//! 控制只读自动化调用 (读取标题、提取文本、查询元素属性等) 的结果保留多久、保留多少。
//!
//! 页面状态会随导航和用户操作变化，TTL 应与页面内容的预期稳定时间相当；
//! 长时间运行的抓取任务可以调大，交互式会话应保持较短。
//!
//! ```rust
//! use webpilot_core::config::CacheConfig;
//! use std::time::Duration;
//!
//! // 每个标签页一个命名空间，页面内容 10 分钟内视为稳定
//! let config = CacheConfig::default()
//!     .with_max_entries(2000)
//!     .with_default_ttl(Duration::from_secs(600))
//!     .with_key_prefix("tab-3".to_string());
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// 条目数上限
pub const MAX_CACHE_ENTRIES: usize = 100_000;

/// TTL 上限 (1 天)
///
/// 单次调用传入的 TTL 超过此值时按此值截断。
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// 自动化结果缓存配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 关闭后所有读取都直达浏览器后端，且不记录统计
    ///
    /// 与预设的缓存开关不同：预设只影响优化器是否走缓存路径，这里关闭的是存储本身。
    pub enabled: bool,

    /// 保留的结果条数，写满后丢弃最久未读取的页面结果
    pub max_entries: usize,

    /// 调用方未指定 TTL 时结果的有效期
    pub default_ttl: Duration,

    /// 按标签页或会话隔离缓存结果，例如 `"tab-3"`、`"session-a"`
    ///
    /// 同一工具调用在不同标签页上返回的页面内容不同，必须分开缓存。
    pub key_prefix: Option<String>,

    /// 是否统计命中、未命中与淘汰次数
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            default_ttl: Duration::from_secs(300),
            key_prefix: None,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            max_entries,
            default_ttl,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// 为某个标签页或会话设置命名空间
    pub fn with_key_prefix(mut self, prefix: String) -> Self {
        self.key_prefix = Some(prefix);
        self
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// 将单次调用的 TTL 解析为实际使用的有效期
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or(self.default_ttl).min(MAX_CACHE_TTL)
    }

    /// 检查条目数与 TTL 是否在允许范围内
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 || self.max_entries > MAX_CACHE_ENTRIES {
            return Err(format!(
                "max_entries must be between 1 and {}, got {}",
                MAX_CACHE_ENTRIES, self.max_entries
            ));
        }

        if self.default_ttl.is_zero() || self.default_ttl > MAX_CACHE_TTL {
            return Err(format!(
                "default_ttl must be between 1ms and {}s, got {:?}",
                MAX_CACHE_TTL.as_secs(),
                self.default_ttl
            ));
        }

        Ok(())
    }
}
