//! # WebPilot Core Library
//!
//! Performance layer for WebPilot browser automation.
//!
//! Wraps an external automation backend with result caching, bounded
//! parallel dispatch and named optimization presets.
//!
//! ## Architecture
//!
//! - **Cache**: LRU + TTL result cache with per-key computation dedup
//! - **Dispatcher**: Bounded-concurrency batch execution with per-item isolation
//! - **Profile**: Named presets (`speed`, `accuracy`, `balanced`, `batch`)
//! - **Optimizer**: Composition of the above around an [`AutomationBackend`]
//! - **Config**: TOML file + environment variable configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use webpilot_core::{
//!     AutomationBackend, CacheStore, OperationDescriptor, PerformanceOptimizer,
//!     ProfileSelector, Result,
//! };
//!
//! struct Browser;
//!
//! #[async_trait::async_trait]
//! impl AutomationBackend for Browser {
//!     async fn invoke(&self, operation: &OperationDescriptor) -> Result<Value> {
//!         Ok(json!({ "tool": operation.name }))
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let optimizer = PerformanceOptimizer::new(
//!     Arc::new(CacheStore::default()),
//!     Arc::new(Browser),
//!     ProfileSelector::select("balanced")?,
//! );
//!
//! let title = optimizer
//!     .execute(&OperationDescriptor::read("webpilot_get_title"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use webpilot_types::*;

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod optimizer;
pub mod profile;

pub use cache::{CacheKey, CacheStats, CacheStore};
pub use config::{Config, ConfigLoader};
pub use dispatcher::{BatchItemError, BatchOutcome, BatchReport, DispatcherStats, ParallelDispatcher};
pub use error::{Result, WebPilotError};
pub use optimizer::{AutomationBackend, PerformanceOptimizer, PerformanceReport};
pub use profile::{ProfileSelector, ProfileSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
