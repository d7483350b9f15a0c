//! # Optimization Profiles
//!
//! 命名预设：一次性设定缓存开关、TTL 与并发上限。
//!
//! | 预设       | 缓存 | TTL    | 并发 |
//! |------------|------|--------|------|
//! | `speed`    | 开   | 60s    | 8    |
//! | `accuracy` | 关   | -      | 1    |
//! | `balanced` | 开   | 300s   | 4    |
//! | `batch`    | 开   | 900s   | 8    |
//!
//! 未知名称一律返回 [`WebPilotError::UnknownProfile`]，不做模糊匹配，也不回退到默认预设。

use std::time::Duration;

use serde::Serialize;
use webpilot_types::{OptimizationProfile, ProfileName};

use crate::error::{Result, WebPilotError};

/// 预设选择器
pub struct ProfileSelector;

impl ProfileSelector {
    /// 按名称选择预设
    ///
    /// 名称区分大小写，仅去除首尾空白。
    pub fn select(name: &str) -> Result<OptimizationProfile> {
        let trimmed = name.trim();
        ProfileName::ALL
            .iter()
            .find(|candidate| candidate.as_str() == trimmed)
            .map(|candidate| Self::preset(*candidate))
            .ok_or_else(|| WebPilotError::unknown_profile(name))
    }

    /// 预设的具体参数
    pub fn preset(name: ProfileName) -> OptimizationProfile {
        match name {
            ProfileName::Speed => OptimizationProfile {
                name,
                cache_enabled: true,
                cache_ttl: Duration::from_secs(60),
                max_concurrency: 8,
            },
            ProfileName::Accuracy => OptimizationProfile {
                name,
                cache_enabled: false,
                cache_ttl: Duration::ZERO,
                max_concurrency: 1,
            },
            ProfileName::Balanced => OptimizationProfile {
                name,
                cache_enabled: true,
                cache_ttl: Duration::from_secs(300),
                max_concurrency: 4,
            },
            ProfileName::Batch => OptimizationProfile {
                name,
                cache_enabled: true,
                cache_ttl: Duration::from_secs(900),
                max_concurrency: 8,
            },
        }
    }

    /// 所有可用预设名称
    pub fn available() -> Vec<&'static str> {
        ProfileName::ALL.iter().map(ProfileName::as_str).collect()
    }
}

/// 应用预设后返回给调用方的设置视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSettings {
    pub scenario: ProfileName,
    pub settings: ProfileSettingValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSettingValues {
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub max_concurrency: usize,
}

impl From<&OptimizationProfile> for ProfileSettings {
    fn from(profile: &OptimizationProfile) -> Self {
        Self {
            scenario: profile.name,
            settings: ProfileSettingValues {
                cache_enabled: profile.cache_enabled,
                cache_ttl_secs: profile.cache_ttl.as_secs(),
                max_concurrency: profile.max_concurrency,
            },
        }
    }
}
