//! 重试策略
//!
//! 把 "最多尝试几次、两次之间等多久" 抽成一个值对象，
//! 由调用方注入到各个需要重试的操作里。测试中使用 `RetryPolicy::immediate`。

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// 两次尝试之间的等待方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 不等待
    None,
    /// 固定间隔
    Fixed(Duration),
    /// 在 [min, max] 内均匀随机
    Uniform { min: Duration, max: Duration },
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含第一次）
    pub max_attempts: usize,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn uniform(max_attempts: usize, min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            max_attempts,
            backoff: Backoff::Uniform { min, max },
        }
    }

    /// 不等待的策略
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
        }
    }

    /// 计算下一次等待时长
    pub fn delay(&self) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Uniform { min, max } => {
                if min == max {
                    min
                } else {
                    rand::thread_rng().gen_range(min..=max)
                }
            }
        }
    }

    /// 第 `attempt` 次（从 1 开始）失败后等待；最后一次失败后不再等待
    pub async fn wait_after(&self, attempt: usize) {
        if attempt >= self.max_attempts {
            return;
        }
        let delay = self.delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
