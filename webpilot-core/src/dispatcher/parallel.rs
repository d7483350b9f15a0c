//! # 并行调度器实现
//!
//! 使用 tokio 信号量限制并发数，所有操作在当前任务内协作式并发执行。
//!
//! ## 适用场景
//! - 多个只读操作 (提取文本、读取标题等)
//! - 针对不同浏览器会话的独立操作
//!
//! 同一浏览器上下文上的并发操作 (例如两个操作同时导航同一页面) 之间没有顺序保证，
//! 需要调用方自行避免。

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use uuid::Uuid;
use webpilot_types::Outcome;

use super::{BatchItemError, BatchOutcome, BatchReport, DispatcherStats};
use crate::config::DispatcherConfig;
use crate::error::{Result, WebPilotError};

/// 并行调度器
pub struct ParallelDispatcher {
    /// 配置
    config: DispatcherConfig,
    /// 执行统计
    stats: Mutex<DispatcherStats>,
    /// 当前执行中的操作数
    in_flight: AtomicUsize,
}

impl ParallelDispatcher {
    /// 创建新的并行调度器
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(DispatcherStats::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// 校验配置后创建调度器
    pub fn try_new(config: DispatcherConfig) -> Result<Self> {
        config.validate().map_err(WebPilotError::configuration)?;
        Ok(Self::new(config))
    }

    /// 获取配置
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 以有界并发执行一批操作
    ///
    /// 返回的结果与 `operations` 按位置一一对应。任何一项的错误、超时或 panic
    /// 都只记为该项的 `Failure`，本方法本身不会失败。
    ///
    /// `max_concurrency` 为 0 时按 1 处理。
    pub async fn run_batch<F, Fut, T, E>(
        &self,
        operations: Vec<F>,
        max_concurrency: usize,
    ) -> Vec<BatchOutcome<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.execute(operations, max_concurrency).await.0
    }

    /// 执行批次，同时返回本批次观察到的最大同时执行数
    async fn execute<F, Fut, T, E>(
        &self,
        operations: Vec<F>,
        max_concurrency: usize,
    ) -> (Vec<BatchOutcome<T, E>>, usize)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let limit = if max_concurrency == 0 {
            tracing::warn!("max_concurrency 0 is not allowed, running batch sequentially");
            1
        } else {
            max_concurrency
        };

        let count = operations.len();
        tracing::debug!(count, max_concurrency = limit, "Executing batch");

        // 信号量公平 (FIFO)，按输入顺序启动
        let semaphore = Semaphore::new(limit);
        let gauge = BatchGauge::default();
        let futures = operations.into_iter().enumerate().map(|(index, operation)| {
            let semaphore = &semaphore;
            let gauge = &gauge;
            async move {
                // 本地信号量从不关闭
                let _permit = semaphore.acquire().await.ok();
                self.run_item(index, operation, gauge).await
            }
        });

        // join_all 的输出顺序与输入顺序一致
        let outcomes = join_all(futures).await;

        self.stats.lock().batches += 1;
        (outcomes, gauge.peak.load(Ordering::SeqCst))
    }

    /// 使用配置中的并发上限执行批次
    pub async fn dispatch<F, Fut, T, E>(&self, operations: Vec<F>) -> Vec<BatchOutcome<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.run_batch(operations, self.config.max_concurrency).await
    }

    /// 执行批次并生成报告
    pub async fn run_job<F, Fut, T, E>(
        &self,
        operations: Vec<F>,
        max_concurrency: usize,
    ) -> BatchReport<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let concurrency_limit = max_concurrency.max(1);

        let (outcomes, peak_in_flight) = self.execute(operations, concurrency_limit).await;

        let report = BatchReport {
            job_id,
            concurrency_limit,
            peak_in_flight,
            started_at,
            elapsed: start.elapsed(),
            outcomes,
        };

        tracing::info!(
            job_id = %report.job_id,
            total = report.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            peak_in_flight = report.peak_in_flight,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch completed"
        );

        report
    }

    /// 获取统计信息
    pub fn stats(&self) -> DispatcherStats {
        self.stats.lock().clone()
    }

    /// 当前执行中的操作数 (所有批次合计)
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 执行单项，捕获错误、超时与 panic
    async fn run_item<F, Fut, T, E>(
        &self,
        index: usize,
        operation: F,
        gauge: &BatchGauge,
    ) -> BatchOutcome<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let start = Instant::now();
        let _tracker = InFlightTracker::enter(self, gauge);

        // 在 async 块内调用，使同步 panic 也能被捕获
        let guarded = AssertUnwindSafe(async move { operation().await }).catch_unwind();

        let outcome = match self.config.item_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, guarded).await {
                Ok(result) => classify(result),
                Err(_) => Outcome::failure(BatchItemError::TimedOut(timeout)),
            },
            None => classify(guarded.await),
        };

        let duration = start.elapsed();
        match &outcome {
            Outcome::Failure {
                error: BatchItemError::TimedOut(timeout),
            } => {
                tracing::warn!(index, timeout_ms = timeout.as_millis() as u64, "Batch item timed out");
            }
            Outcome::Failure {
                error: BatchItemError::Panicked(message),
            } => {
                tracing::warn!(index, panic = %message, "Batch item panicked");
            }
            Outcome::Failure { .. } => {
                tracing::debug!(index, "Batch item failed");
            }
            Outcome::Success { .. } => {}
        }

        self.update_stats(&outcome, duration);
        outcome
    }

    /// 更新统计信息
    fn update_stats<T, E>(&self, outcome: &BatchOutcome<T, E>, duration: Duration) {
        let mut stats = self.stats.lock();
        stats.total_executed += 1;
        match outcome {
            Outcome::Success { .. } => stats.succeeded += 1,
            Outcome::Failure { error } => {
                stats.failed += 1;
                match error {
                    BatchItemError::TimedOut(_) => stats.timed_out += 1,
                    BatchItemError::Panicked(_) => stats.panicked += 1,
                    BatchItemError::Failed(_) => {}
                }
            }
        }

        // 更新平均时长
        let total = stats.total_executed as f64;
        let current_avg = stats.avg_duration_secs;
        stats.avg_duration_secs = (current_avg * (total - 1.0) + duration.as_secs_f64()) / total;
    }
}

impl Default for ParallelDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

/// 单个批次的执行中计数
#[derive(Default)]
struct BatchGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// 维护执行中计数与峰值 (调度器全局与所属批次各一份)
struct InFlightTracker<'a> {
    dispatcher: &'a ParallelDispatcher,
    gauge: &'a BatchGauge,
}

impl<'a> InFlightTracker<'a> {
    fn enter(dispatcher: &'a ParallelDispatcher, gauge: &'a BatchGauge) -> Self {
        let in_batch = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.peak.fetch_max(in_batch, Ordering::SeqCst);

        let current = dispatcher.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stats = dispatcher.stats.lock();
        stats.peak_in_flight = stats.peak_in_flight.max(current);
        Self { dispatcher, gauge }
    }
}

impl Drop for InFlightTracker<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        self.dispatcher.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn classify<T, E>(
    result: std::result::Result<std::result::Result<T, E>, Box<dyn Any + Send>>,
) -> BatchOutcome<T, E> {
    match result {
        Ok(Ok(value)) => Outcome::success(value),
        Ok(Err(error)) => Outcome::failure(BatchItemError::Failed(error)),
        Err(payload) => Outcome::failure(BatchItemError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
