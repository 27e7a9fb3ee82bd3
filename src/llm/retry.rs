//! 自动重试策略（指数退避）
//!
//! 与具体远端实现解耦：包装任意返回 Future 的操作，由 tokio-retry2 驱动。
//! 客户端错误（4xx）映射为 Permanent 立即返回；其余错误为 Transient，
//! 按 `base_delay * 2^attempt` 等待后重试，用尽次数后原样返回最后一个错误。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_retry2::strategy::ExponentialBackoff;
use tokio_retry2::{Retry, RetryError};

use crate::config::RetrySection;

/// 可区分「可重试」与「永久失败」的错误
pub trait RetryableError {
    /// 网络错误、5xx、超时等瞬时错误返回 true；401 / 400 等返回 false
    fn is_retryable(&self) -> bool;
}

/// 重试参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含首次），至少 1
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn from_config(section: &RetrySection) -> Self {
        Self::new(section.max_attempts, section.base_delay())
    }

    /// 第 attempt 次（从 0 开始）失败后的等待时长
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// 首次失败之后各次重试前的等待：base, 2*base, 4*base ...（共 max_attempts - 1 个）
    ///
    /// ExponentialBackoff 产生 `factor * 2^n`（n 从 1 开始），除以 2 即 `base * 2^(n-1)`。
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let retries = self.max_attempts.max(1) as usize - 1;
        ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .map(|delay| delay / 2)
            .take(retries)
    }

    /// 执行 op，按策略重试
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let policy = *self;
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 0u32;

        let result = Retry::spawn(policy.strategy(), || {
            attempt += 1;
            let current = attempt;
            let fut = op();
            async move {
                fut.await.map_err(|err| {
                    if !err.is_retryable() {
                        tracing::debug!(error = %err, "Non-retryable error, giving up");
                        return RetryError::Permanent(err);
                    }
                    if current < attempts {
                        tracing::warn!(
                            error = %err,
                            attempt = current,
                            max_attempts = attempts,
                            delay_ms = policy.delay_for(current - 1).as_millis() as u64,
                            "AI request failed, retrying"
                        );
                    }
                    RetryError::Transient {
                        err,
                        retry_after: None,
                    }
                })
            }
        })
        .await;

        if let Err(err) = &result {
            if err.is_retryable() {
                tracing::warn!(error = %err, attempts, "Retries exhausted");
            }
        }
        result
    }
}
