//! # Cache Store
//!
//! 自动化调用结果的 LRU + TTL 缓存。
//!
//! ## 特性
//!
//! - 基于 `lru::LruCache` 的最近最少使用淘汰
//! - TTL 支持，过期条目在访问时惰性清理（无后台定时器）
//! - 相同键的并发请求只计算一次（按键加锁）
//! - 计算失败不缓存，下次调用会重新执行
//! - 缓存统计 (命中率、淘汰数等)
//!
//! ## 示例
//!
//! ```rust
//! use webpilot_core::cache::CacheStore;
//! use webpilot_core::config::CacheConfig;
//!
//! # async fn example() -> Result<(), std::io::Error> {
//! let cache: CacheStore<String> = CacheStore::new(CacheConfig::default());
//!
//! let title = cache
//!     .get_or_compute("webpilot_get_title:home", || async {
//!         Ok::<_, std::io::Error>("Example Domain".to_string())
//!     }, None)
//!     .await?;
//! assert_eq!(title, "Example Domain");
//!
//! let stats = cache.stats();
//! assert_eq!(stats.misses, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use webpilot_types::OperationKind;

use crate::config::CacheConfig;
use crate::error::{Result, WebPilotError};

/// 缓存统计指标
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// 命中次数
    hits: AtomicU64,
    /// 未命中次数
    misses: AtomicU64,
    /// 淘汰次数
    evictions: AtomicU64,
    /// 过期清理次数
    expirations: AtomicU64,
    /// 失效次数
    invalidations: AtomicU64,
}

impl CacheMetrics {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// 命中率 = hits / (hits + misses)，无请求时为 0.0
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let lookups = hits + self.misses();
        if lookups == 0 {
            return 0.0;
        }
        (hits as f64) / (lookups as f64)
    }

    /// 重置所有统计
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
    }
}

/// 缓存统计快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// 当前条目数
    pub entries: usize,
    /// 容量
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
    /// 命中率 (0.0 - 1.0)
    pub hit_rate: f64,
}

/// 热点条目信息 (用于报告)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub hit_count: u64,
    pub age_secs: f64,
    pub idle_secs: f64,
    pub ttl_remaining_secs: f64,
}

/// 缓存条目
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    /// 最后访问时间 (LRU 顺序由 LruCache 维护，这里仅用于报告)
    last_accessed: Instant,
    /// 命中次数，仅用于统计
    hit_count: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
            last_accessed: now,
            hit_count: 0,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    fn record_access(&mut self, now: Instant) {
        self.last_accessed = now;
        self.hit_count += 1;
    }
}

/// LRU + TTL 结果缓存
///
/// 通过构造函数注入到需要缓存的组件中，不使用全局状态。
pub struct CacheStore<V> {
    config: CacheConfig,
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    /// 正在计算中的键
    in_flight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    metrics: CacheMetrics,
}

impl<V: Clone> CacheStore<V> {
    /// 创建新的缓存
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            metrics: CacheMetrics::default(),
        }
    }

    /// 校验配置后创建缓存
    pub fn try_new(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(WebPilotError::configuration)?;
        Ok(Self::new(config))
    }

    /// 获取配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 获取统计指标
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// 获取缓存值
    ///
    /// 命中时把条目移到最近使用位置；过期条目被清理并视为未命中。
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.config.enabled {
            return None;
        }

        let value = self.try_hit(key);
        if value.is_none() {
            self.record_miss(key);
        }
        value
    }

    /// 添加或更新缓存
    ///
    /// 缓存已满时先清理过期条目，仍然已满则淘汰最久未访问的条目。
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }

        let key = key.into();
        // 截断到 MAX_CACHE_TTL，避免 Instant 溢出
        let ttl = self.config.effective_ttl(ttl);
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if !entries.contains(key.as_str()) && entries.len() >= entries.cap().get() {
            let purged = purge_expired(&mut entries, now);
            if purged > 0 {
                self.bump(&self.metrics.expirations, purged as u64);
            }

            if entries.len() >= entries.cap().get() {
                if let Some((evicted_key, _)) = entries.pop_lru() {
                    tracing::debug!(key = %evicted_key, "Cache evicted");
                    self.bump(&self.metrics.evictions, 1);
                }
            }
        }

        entries.put(key, CacheEntry::new(value, ttl, now));
    }

    /// 命中则返回缓存值，否则执行 `compute` 并缓存成功结果
    ///
    /// - `compute` 必须是幂等、无副作用的读取操作；命中时它不会被执行
    /// - `compute` 返回错误时原样返回，且不写入缓存
    /// - 同一个键的并发调用共享一次计算：后到者等待，随后作为命中返回
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(value) = self.try_hit(key) {
            return Ok(value);
        }

        let mut slot = FlightSlot::register(self, key);
        slot.acquire().await;

        // 等待期间可能已由其他调用者计算完成
        if let Some(value) = self.try_hit(key) {
            return Ok(value);
        }

        self.record_miss(key);
        let value = compute().await?;
        self.put(key, value.clone(), ttl);
        Ok(value)
    }

    /// 带操作类型检查的 [`get_or_compute`](Self::get_or_compute)
    ///
    /// 有副作用的操作 (点击、提交表单等) 会被拒绝，`compute` 不会执行。
    pub async fn get_or_compute_op<F, Fut>(
        &self,
        kind: OperationKind,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if !kind.is_cacheable() {
            return Err(WebPilotError::not_cacheable(format!(
                "'{}' is a mutating operation and must be executed directly",
                key
            )));
        }

        self.get_or_compute(key, compute, ttl).await
    }

    /// 使缓存失效，返回条目是否存在
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.lock().pop(key).is_some();
        if removed {
            self.bump(&self.metrics.invalidations, 1);
        }
        removed
    }

    /// 批量使缓存失效，返回移除的条目数
    pub fn invalidate_batch(&self, keys: &[String]) -> usize {
        let mut entries = self.entries.lock();
        let removed = keys
            .iter()
            .filter(|key| entries.pop(key.as_str()).is_some())
            .count();
        self.bump(&self.metrics.invalidations, removed as u64);
        removed
    }

    /// 移除所有以 `prefix` 开头的条目
    ///
    /// 例如在导航后清除某个读取工具的全部缓存结果。
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let keys: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            entries.pop(key.as_str());
        }
        self.bump(&self.metrics.invalidations, keys.len() as u64);

        if !keys.is_empty() {
            tracing::debug!(prefix, removed = keys.len(), "Cache invalidated by prefix");
        }
        keys.len()
    }

    /// 清空缓存并重置统计
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.metrics.reset();
    }

    /// 移除过期的条目，返回移除数量
    pub fn remove_expired_entries(&self) -> usize {
        let count = purge_expired(&mut self.entries.lock(), Instant::now());
        self.bump(&self.metrics.expirations, count as u64);
        count
    }

    /// 当前条目数 (可能包含尚未清理的过期条目)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// 是否存在未过期的条目 (不影响 LRU 顺序和统计)
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// 正在计算中的键数量
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// 获取缓存统计快照
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.config.max_entries,
            hits: self.metrics.hits(),
            misses: self.metrics.misses(),
            evictions: self.metrics.evictions(),
            expirations: self.metrics.expirations(),
            invalidations: self.metrics.invalidations(),
            hit_rate: self.metrics.hit_rate(),
        }
    }

    /// 命中次数最多的 `limit` 个未过期条目
    pub fn hottest(&self, limit: usize) -> Vec<CacheEntryInfo> {
        let now = Instant::now();
        let entries = self.entries.lock();

        let mut hot: Vec<CacheEntryInfo> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| CacheEntryInfo {
                key: key.clone(),
                hit_count: entry.hit_count,
                age_secs: now.duration_since(entry.created_at).as_secs_f64(),
                idle_secs: now.duration_since(entry.last_accessed).as_secs_f64(),
                ttl_remaining_secs: entry.expires_at.duration_since(now).as_secs_f64(),
            })
            .collect();

        hot.sort_by(|a, b| b.hit_count.cmp(&a.hit_count).then_with(|| a.key.cmp(&b.key)));
        hot.truncate(limit);
        hot
    }

    /// 查找未过期条目；命中时记录统计，过期时清理
    fn try_hit(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = entries.peek(key)?.is_expired(now);
        if expired {
            entries.pop(key);
            self.bump(&self.metrics.expirations, 1);
            tracing::trace!(key, "Cache entry expired");
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.record_access(now);
        self.bump(&self.metrics.hits, 1);
        tracing::trace!(key, hit_count = entry.hit_count, "Cache hit");
        Some(entry.value.clone())
    }

    fn record_miss(&self, key: &str) {
        self.bump(&self.metrics.misses, 1);
        tracing::trace!(key, "Cache miss");
    }

    fn bump(&self, counter: &AtomicU64, n: u64) {
        if self.config.enable_metrics && n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// 移除过期条目，返回数量
fn purge_expired<V>(entries: &mut LruCache<String, CacheEntry<V>>, now: Instant) -> usize {
    let expired: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();

    for key in &expired {
        entries.pop(key.as_str());
    }
    expired.len()
}

/// 按键的计算锁
///
/// drop 时释放锁；没有其他等待者时从 `in_flight` 中移除。
struct FlightSlot<'a, V> {
    store: &'a CacheStore<V>,
    key: &'a str,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a, V> FlightSlot<'a, V> {
    fn register(store: &'a CacheStore<V>, key: &'a str) -> Self {
        let lock = store
            .in_flight
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();

        Self {
            store,
            key,
            lock,
            guard: None,
        }
    }

    async fn acquire(&mut self) {
        self.guard = Some(self.lock.clone().lock_owned().await);
    }
}

impl<V> Drop for FlightSlot<'_, V> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut in_flight = self.store.in_flight.lock();
        // map + self
        if Arc::strong_count(&self.lock) <= 2
            && in_flight
                .get(self.key)
                .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock))
        {
            in_flight.remove(self.key);
        }
    }
}
