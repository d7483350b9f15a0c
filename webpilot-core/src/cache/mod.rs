//! # Cache Module
//!
//! 自动化调用结果缓存。
//!
//! ## 模块结构
//!
//! - `key`: 由操作名和参数生成确定性缓存键
//! - `store`: LRU + TTL 缓存核心实现
//!
//! ## 特性
//!
//! - LRU 淘汰策略
//! - TTL 支持 (惰性过期)
//! - 线程安全
//! - 相同键并发计算去重
//! - 缓存统计
//!
//! 只有只读操作 ([`OperationKind::Read`](webpilot_types::OperationKind)) 应该被缓存；
//! 点击、提交表单等操作在命中时会被静默跳过。

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheEntryInfo, CacheMetrics, CacheStats, CacheStore};
