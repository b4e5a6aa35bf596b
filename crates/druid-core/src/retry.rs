//! 重排建议与失败退避。

use std::borrow::Cow;
use std::time::Duration;

/// 重排建议：可选的等待时长与原因描述。
///
/// # 契约说明
/// - `wait` 为 `None` 表示发出方不指定延迟，由外层调谐器套用默认的重排间隔；
/// - `reason` 面向事件与日志，应说明为何需要重新调谐。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryAdvice {
    wait: Option<Duration>,
    reason: Option<Cow<'static, str>>,
}

impl RetryAdvice {
    /// 不指定等待时长的建议。
    pub const fn unspecified() -> Self {
        Self {
            wait: None,
            reason: None,
        }
    }

    pub const fn after(wait: Duration) -> Self {
        Self {
            wait: Some(wait),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<Cow<'static, str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn wait(&self) -> Option<Duration> {
        self.wait
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// 解析最终等待时长：未指定时回落到 `default`。
    pub fn resolve(&self, default: Duration) -> Duration {
        self.wait.unwrap_or(default)
    }
}

/// 失败退避策略：指数增长、封顶并带确定性抖动。
///
/// # 教案式说明
/// - **意图（Why）**：同一批集群在同一时刻失败后若按固定间隔重试，会在 API Server 上形成同步尖峰；
/// - **契约（What）**：
///   - `delay_for(attempt, seed)` 中 `attempt` 从 1 开始计数，0 视为 1；
///   - 返回值落在 `[base, max]` 区间；
///   - 相同输入返回相同结果，便于测试；
/// - **实现（How）**：`base * 2^(attempt-1)` 饱和到 `max`，再乘以 ±10% 的 SplitMix64 抖动并夹紧。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

const JITTER_RANGE: f64 = 0.1;

impl BackoffPolicy {
    /// `max` 小于 `base` 时以 `base` 为准。
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn delay_for(&self, attempt: u32, seed: u64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        let raw = self.base.checked_mul(factor).unwrap_or(self.max).min(self.max);

        let jitter = jitter_factor(mix64(seed ^ u64::from(attempt)));
        let jittered = raw.as_secs_f64() * jitter;
        let clamped = jittered.clamp(self.base.as_secs_f64(), self.max.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

#[inline]
fn jitter_factor(mixed: u64) -> f64 {
    let mantissa = (mixed >> 11) as f64;
    let unit = mantissa / ((1u64 << 53) as f64);
    1.0 + (unit * 2.0 - 1.0) * JITTER_RANGE
}

#[inline]
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}
