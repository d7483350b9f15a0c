//! # 并行调度器
//!
//! 以有界并发执行一批相互独立的操作，逐项返回结果。
//!
//! - 任一操作失败 (返回错误、超时或 panic) 只记为该项的 `Failure`，不会中止整个批次
//! - 输出顺序与输入顺序一致，与完成顺序无关
//! - 同一时刻执行中的操作数不超过 `max_concurrency`

pub mod parallel;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use webpilot_types::Outcome;

use crate::error::Result;

pub use parallel::ParallelDispatcher;

/// 批次中单项的失败原因
#[derive(Debug, Error)]
pub enum BatchItemError<E> {
    /// 操作本身返回错误
    #[error("operation failed: {0}")]
    Failed(E),

    /// 超过单项超时时间
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// 操作 panic
    #[error("operation panicked: {0}")]
    Panicked(String),
}

impl<E> BatchItemError<E> {
    /// 原始错误 (仅 `Failed`)
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::TimedOut(_) => "timed_out",
            Self::Panicked(_) => "panicked",
        }
    }
}

/// 批次中单项的结果
pub type BatchOutcome<T, E> = Outcome<T, BatchItemError<E>>;

/// 一次批量执行的完整结果
#[derive(Debug)]
pub struct BatchReport<T, E> {
    /// 批次 ID
    pub job_id: Uuid,
    /// 本次使用的并发上限
    pub concurrency_limit: usize,
    /// 本批次内观察到的最大同时执行数，不受同一调度器上其他批次影响
    pub peak_in_flight: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// 与输入一一对应
    pub outcomes: Vec<BatchOutcome<T, E>>,
}

impl<T, E> BatchReport<T, E> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// 失败项的下标
    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_failure())
            .map(|(i, _)| i)
            .collect()
    }
}

impl<T: Serialize, E: fmt::Display> BatchReport<T, E> {
    /// JSON 视图，错误以字符串形式输出
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let outcomes: Vec<Outcome<&T, String>> = self
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                Outcome::Success { value } => Outcome::success(value),
                Outcome::Failure { error } => Outcome::failure(error.to_string()),
            })
            .collect();

        Ok(serde_json::json!({
            "job_id": self.job_id,
            "concurrency_limit": self.concurrency_limit,
            "peak_in_flight": self.peak_in_flight,
            "started_at": self.started_at,
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "succeeded": self.succeeded(),
            "failed": self.failed(),
            "outcomes": serde_json::to_value(outcomes)?,
        }))
    }
}

/// 调度器统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatcherStats {
    /// 总执行操作数
    pub total_executed: usize,
    /// 成功数
    pub succeeded: usize,
    /// 失败数 (含超时与 panic)
    pub failed: usize,
    pub timed_out: usize,
    pub panicked: usize,
    /// 观察到的最大同时执行数
    ///
    /// 同一调度器上并发运行的多个批次合并计数，因此可能超过单个批次的上限；
    /// 单个批次的峰值见 [`BatchReport::peak_in_flight`]。
    pub peak_in_flight: usize,
    /// 已执行批次数
    pub batches: usize,
    /// 平均执行时长（秒）
    pub avg_duration_secs: f64,
}
