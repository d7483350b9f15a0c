//! # Performance Optimizer
//!
//! 将缓存、并行调度与优化预设组合在一起，包装外部浏览器自动化后端。
//!
//! ## 执行流程
//!
//! ```text
//! OperationDescriptor ──► 只读且预设启用缓存？
//!                           ├─ 是 ──► CacheStore::get_or_compute ──► 命中/后端调用
//!                           └─ 否 ──► 直接调用后端
//!
//! execute_batch ──► ParallelDispatcher (max_concurrency 取自当前预设) ──► 逐项 execute
//! ```
//!
//! 切换预设只影响之后的调用，不会修改已有缓存条目。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use webpilot_types::{OperationDescriptor, OptimizationProfile, ProfileName};

use crate::cache::{CacheEntryInfo, CacheKey, CacheStats, CacheStore};
use crate::config::{Config, DispatcherConfig};
use crate::dispatcher::{BatchReport, DispatcherStats, ParallelDispatcher};
use crate::error::{Result, WebPilotError};
use crate::profile::{ProfileSelector, ProfileSettings};

/// 报告中列出的热点键数量
const HOTTEST_KEYS: usize = 10;

/// 浏览器自动化后端
///
/// 实际的页面交互 (点击、提取文本、截图等) 由实现方完成。
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// 执行一次自动化调用
    ///
    /// # Returns
    /// * `Ok(Value)` - 调用结果
    /// * `Err(WebPilotError::Computation(_))` - 元素不存在、导航超时等
    async fn invoke(&self, operation: &OperationDescriptor) -> Result<Value>;
}

/// 性能报告
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    /// 当前预设
    pub profile: ProfileSettings,
    pub cache: CacheStats,
    pub dispatcher: DispatcherStats,
    /// 命中次数最多的条目
    pub hottest_keys: Vec<CacheEntryInfo>,
}

/// 性能优化器
pub struct PerformanceOptimizer {
    cache: Arc<CacheStore<Value>>,
    backend: Arc<dyn AutomationBackend>,
    profile: RwLock<OptimizationProfile>,
    dispatcher: ParallelDispatcher,
}

impl PerformanceOptimizer {
    /// 创建优化器，缓存由调用方注入
    pub fn new(
        cache: Arc<CacheStore<Value>>,
        backend: Arc<dyn AutomationBackend>,
        profile: OptimizationProfile,
    ) -> Self {
        Self::with_dispatcher(cache, backend, profile, DispatcherConfig::default())
    }

    /// 使用指定调度配置创建优化器
    pub fn with_dispatcher(
        cache: Arc<CacheStore<Value>>,
        backend: Arc<dyn AutomationBackend>,
        profile: OptimizationProfile,
        dispatcher: DispatcherConfig,
    ) -> Self {
        Self {
            cache,
            backend,
            profile: RwLock::new(profile),
            dispatcher: ParallelDispatcher::new(dispatcher),
        }
    }

    /// 由加载好的配置创建优化器
    ///
    /// 配置中指定了预设时使用该预设；否则以 `balanced` 的名义沿用配置里的
    /// 缓存开关、默认 TTL 与并发上限。
    pub fn from_config(config: &Config, backend: Arc<dyn AutomationBackend>) -> Result<Self> {
        let cache = CacheStore::try_new(config.cache.clone())?;
        let dispatcher = ParallelDispatcher::try_new(config.dispatcher.clone())?;

        let profile = match config.active_profile()? {
            Some(profile) => profile,
            None => OptimizationProfile {
                name: ProfileName::Balanced,
                cache_enabled: config.cache.enabled,
                cache_ttl: config.cache.default_ttl,
                max_concurrency: config.dispatcher.max_concurrency,
            },
        };

        info!(
            profile = %profile.name,
            max_entries = config.cache.max_entries,
            max_concurrency = profile.max_concurrency,
            "Performance optimizer configured"
        );

        Ok(Self {
            cache: Arc::new(cache),
            backend,
            profile: RwLock::new(profile),
            dispatcher,
        })
    }

    /// 当前预设
    pub fn profile(&self) -> OptimizationProfile {
        *self.profile.read()
    }

    pub fn cache(&self) -> &Arc<CacheStore<Value>> {
        &self.cache
    }

    /// 按名称切换预设
    pub fn apply_profile(&self, name: &str) -> Result<ProfileSettings> {
        let profile = ProfileSelector::select(name)?;
        *self.profile.write() = profile;

        info!(
            profile = %profile.name,
            cache_enabled = profile.cache_enabled,
            cache_ttl_secs = profile.cache_ttl.as_secs(),
            max_concurrency = profile.max_concurrency,
            "Applied optimization profile"
        );

        Ok(ProfileSettings::from(&profile))
    }

    /// 执行单个操作
    ///
    /// 只读操作在当前预设启用缓存时经过缓存；有副作用的操作总是直接执行，
    /// 也不会隐式使任何缓存失效。
    pub async fn execute(&self, operation: &OperationDescriptor) -> Result<Value> {
        let profile = self.profile();

        if !(profile.cache_enabled && operation.is_cacheable()) {
            debug!(operation = %operation.name, "Executing without cache");
            return self.backend.invoke(operation).await;
        }

        let key = CacheKey::from_descriptor(operation, self.cache.config().key_prefix.as_deref());
        self.cache
            .get_or_compute_op(
                operation.kind,
                key.as_str(),
                || self.backend.invoke(operation),
                Some(profile.cache_ttl),
            )
            .await
    }

    /// 以当前预设的并发上限执行一批操作
    pub async fn execute_batch(
        &self,
        operations: Vec<OperationDescriptor>,
    ) -> BatchReport<Value, WebPilotError> {
        let max_concurrency = self.profile().max_concurrency;

        let jobs: Vec<_> = operations
            .into_iter()
            .map(|operation| move || async move { self.execute(&operation).await })
            .collect();

        self.dispatcher.run_job(jobs, max_concurrency).await
    }

    /// 生成性能报告
    pub fn performance_report(&self) -> PerformanceReport {
        PerformanceReport {
            generated_at: Utc::now(),
            profile: ProfileSettings::from(&self.profile()),
            cache: self.cache.stats(),
            dispatcher: self.dispatcher.stats(),
            hottest_keys: self.cache.hottest(HOTTEST_KEYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 记录调用次数的模拟后端
    #[derive(Default)]
    struct MockBackend {
        calls: AtomicUsize,
    }

    impl MockBackend {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AutomationBackend for MockBackend {
        async fn invoke(&self, operation: &OperationDescriptor) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if operation.name == "webpilot_fail" {
                return Err(WebPilotError::computation("element not found"));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!({ "tool": operation.name, "params": operation.params }))
        }
    }

    fn optimizer(profile: ProfileName) -> (PerformanceOptimizer, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        let cache = Arc::new(CacheStore::new(CacheConfig::default()));
        let optimizer =
            PerformanceOptimizer::new(cache, backend.clone(), ProfileSelector::preset(profile));
        (optimizer, backend)
    }

    #[tokio::test]
    async fn test_read_is_cached() {
        let (optimizer, backend) = optimizer(ProfileName::Balanced);
        let op = OperationDescriptor::read("webpilot_get_text").with_param("selector", "h1");

        let first = optimizer.execute(&op).await.unwrap();
        let second = optimizer.execute(&op).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls(), 1);
        assert_eq!(optimizer.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_mutating_always_executes() {
        let (optimizer, backend) = optimizer(ProfileName::Speed);
        let op = OperationDescriptor::mutating("webpilot_click").with_param("selector", "#submit");

        optimizer.execute(&op).await.unwrap();
        optimizer.execute(&op).await.unwrap();

        assert_eq!(backend.calls(), 2);
        assert!(optimizer.cache().is_empty());
    }

    #[tokio::test]
    async fn test_accuracy_profile_bypasses_cache() {
        let (optimizer, backend) = optimizer(ProfileName::Balanced);
        let settings = optimizer.apply_profile("accuracy").unwrap();
        assert!(!settings.settings.cache_enabled);
        assert_eq!(settings.settings.max_concurrency, 1);

        let op = OperationDescriptor::read("webpilot_get_title");
        optimizer.execute(&op).await.unwrap();
        optimizer.execute(&op).await.unwrap();

        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_profile_keeps_current() {
        let (optimizer, _) = optimizer(ProfileName::Speed);
        let err = optimizer.apply_profile("turbo").unwrap_err();
        assert!(matches!(err, WebPilotError::UnknownProfile(name) if name == "turbo"));
        assert_eq!(optimizer.profile().name, ProfileName::Speed);
    }

    #[tokio::test]
    async fn test_profile_switch_keeps_existing_entries() {
        let (optimizer, backend) = optimizer(ProfileName::Balanced);
        let op = OperationDescriptor::read("webpilot_get_text");
        optimizer.execute(&op).await.unwrap();

        optimizer.apply_profile("speed").unwrap();
        optimizer.execute(&op).await.unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(optimizer.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_call_is_not_cached() {
        let (optimizer, backend) = optimizer(ProfileName::Balanced);
        let op = OperationDescriptor::read("webpilot_fail");

        assert!(optimizer.execute(&op).await.is_err());
        assert!(optimizer.execute(&op).await.is_err());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let (optimizer, _) = optimizer(ProfileName::Batch);
        let report = optimizer
            .execute_batch(vec![
                OperationDescriptor::read("webpilot_get_text").with_param("selector", "h1"),
                OperationDescriptor::read("webpilot_fail"),
                OperationDescriptor::read("webpilot_get_title"),
            ])
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed_indices(), vec![1]);
        assert_eq!(report.concurrency_limit, 8);
        assert_eq!(
            report.outcomes[2].value().map(|v| v["tool"].clone()),
            Some(json!("webpilot_get_title"))
        );
    }

    #[tokio::test]
    async fn test_performance_report() {
        let (optimizer, _) = optimizer(ProfileName::Balanced);
        let op = OperationDescriptor::read("webpilot_get_text");
        optimizer.execute(&op).await.unwrap();
        optimizer.execute(&op).await.unwrap();
        optimizer.execute_batch(vec![op.clone()]).await;

        let report = optimizer.performance_report();
        assert_eq!(report.profile.scenario, ProfileName::Balanced);
        assert_eq!(report.cache.hits, 2);
        assert_eq!(report.cache.misses, 1);
        assert_eq!(report.dispatcher.total_executed, 1);
        assert_eq!(report.hottest_keys.len(), 1);
        assert_eq!(report.hottest_keys[0].hit_count, 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["profile"]["scenario"], "balanced");
    }

    #[tokio::test]
    async fn test_from_config_without_profile_uses_config_values() {
        let backend = Arc::new(MockBackend::default());
        let mut config = Config::default();
        config.cache.default_ttl = Duration::from_secs(42);
        config.dispatcher.max_concurrency = 6;

        let optimizer = PerformanceOptimizer::from_config(&config, backend).unwrap();
        let profile = optimizer.profile();
        assert_eq!(profile.name, ProfileName::Balanced);
        assert!(profile.cache_enabled);
        assert_eq!(profile.cache_ttl, Duration::from_secs(42));
        assert_eq!(profile.max_concurrency, 6);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_sections() {
        let backend = Arc::new(MockBackend::default());
        let mut config = Config::default();
        config.dispatcher.max_concurrency = 0;

        assert!(matches!(
            PerformanceOptimizer::from_config(&config, backend),
            Err(WebPilotError::Configuration(_))
        ));
    }
}
