//! 有界重试执行器
//!
//! 所有轮询点（链验证、句柄刷新、写确认）共用的重试抽象：
//! 尝试预算 + 延迟策略。库内禁止出现无界循环。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// 重试间隔策略
#[derive(Debug, Clone)]
pub enum DelayStrategy {
    /// 固定间隔
    Fixed(Duration),
    /// 渐进间隔：delay_i = min(base * (1 + i * growth), cap)
    Progressive {
        base: Duration,
        growth: f64,
        cap: Duration,
    },
    /// 指数退避：delay_i = min(initial * multiplier^i, cap)
    Exponential {
        initial: Duration,
        multiplier: f64,
        cap: Duration,
    },
}

impl DelayStrategy {
    /// 第 attempt 次尝试之后的等待时长（attempt 从 0 开始）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            DelayStrategy::Fixed(interval) => *interval,
            DelayStrategy::Progressive { base, growth, cap } => {
                let scaled = base.mul_f64(1.0 + attempt as f64 * growth);
                scaled.min(*cap)
            }
            DelayStrategy::Exponential {
                initial,
                multiplier,
                cap,
            } => {
                let scaled = initial.mul_f64(multiplier.powi(attempt as i32));
                scaled.min(*cap)
            }
        }
    }
}

/// 重试结果：操作提前完成，或尝试预算耗尽
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Completed(T),
    Exhausted,
}

impl<T> RetryOutcome<T> {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryOutcome::Exhausted)
    }
}

/// 有界重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: DelayStrategy,
}

impl RetryPolicy {
    /// 固定间隔策略
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayStrategy::Fixed(interval),
        }
    }

    /// 渐进间隔策略（growth = 0.3）
    pub fn progressive(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayStrategy::Progressive {
                base,
                growth: 0.3,
                cap,
            },
        }
    }

    /// 执行操作直到返回 Some 或预算耗尽
    ///
    /// 操作返回 `Some(T)` 表示完成（立即返回，不再等待），
    /// 返回 `None` 表示本次未果，等待后重试。
    /// 最后一次尝试之后不再等待。
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for attempt in 0..self.max_attempts {
            if let Some(value) = op(attempt).await {
                return RetryOutcome::Completed(value);
            }
            if attempt + 1 < self.max_attempts {
                sleep(self.delay.delay_for(attempt)).await;
            }
        }
        RetryOutcome::Exhausted
    }

    /// 所有间隔之和（不含操作本身耗时），用于日志与预算估计
    pub fn total_delay_budget(&self) -> Duration {
        let mut total = Duration::ZERO;
        for attempt in 0..self.max_attempts.saturating_sub(1) {
            total += self.delay.delay_for(attempt);
        }
        total
    }
}
