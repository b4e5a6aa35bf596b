//! 调用上下文：取消令牌与截止时间。
//!
//! # 教案式说明
//! - **意图（Why）**：单次调谐内的每个对象存储调用都是阻塞的网络请求，外层调谐器关闭或超时时，
//!   组件必须立即返回，且不能留下“发了一半”的破坏性动作；
//! - **契约（What）**：[`run_with_context`] 在发起调用前检查取消与截止时间，并在调用期间与二者竞速；
//!   一旦中断，返回分类为 `Cancelled` / `Timeout` 的 [`DruidError`]，后续调用不再发出；
//! - **风险（Trade-offs）**：竞速只能放弃等待结果，无法撤回已送达服务端的请求；
//!   组件因此将每个破坏性动作限定为单次调用。

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{DruidError, OperationKind};
use crate::store::StoreError;

/// 可在多方共享的取消令牌。
///
/// `cancel` 首次成功设置取消位时返回 `true`，重复调用返回 `false`。
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<CancellationState>,
}

#[derive(Debug, Default)]
struct CancellationState {
    flag: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    pub fn cancel(&self) -> bool {
        let first = self
            .inner
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// 等待直到令牌被取消。
    pub async fn cancelled(&self) {
        loop {
            // 先登记等待者再检查取消位，避免错过 `notify_waiters`。
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// 单调时钟上的截止时间，`None` 表示不设上限。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    instant: Option<Instant>,
}

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self {
            instant: Some(instant),
        }
    }

    /// 以当前时间加 `timeout` 生成截止时间。
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.instant
    }

    pub fn is_expired(&self) -> bool {
        self.instant.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// 单次调谐调用的上下文。
#[derive(Clone, Debug, Default)]
pub struct OperatorContext {
    cancellation: Cancellation,
    deadline: Deadline,
}

impl OperatorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }
}

/// 在保留取消 / 截止语义的前提下执行一次对象存储调用。
///
/// - `target` 描述调用对象（集群或成员标识），写入错误消息；
/// - 存储失败按 `kind` 包装为致命错误，并保留 [`StoreError`] 作为 `source()`。
pub async fn run_with_context<F, T>(
    ctx: &OperatorContext,
    kind: OperationKind,
    target: &(dyn fmt::Display + Sync),
    future: F,
) -> Result<T, DruidError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    if ctx.cancellation().is_cancelled() {
        return Err(DruidError::cancelled(
            kind.operation,
            format!("cancelled before {} {target}", kind.operation),
        ));
    }
    if ctx.deadline().is_expired() {
        return Err(DruidError::deadline_exceeded(
            kind.operation,
            format!("deadline exceeded before {} {target}", kind.operation),
        ));
    }

    let cancelled = ctx.cancellation().cancelled();
    tokio::pin!(cancelled);
    tokio::pin!(future);

    let outcome = if let Some(deadline) = ctx.deadline().instant() {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        tokio::select! {
            biased;
            _ = &mut cancelled => return Err(DruidError::cancelled(
                kind.operation,
                format!("cancelled during {} {target}", kind.operation),
            )),
            _ = &mut sleep => return Err(DruidError::deadline_exceeded(
                kind.operation,
                format!("deadline exceeded during {} {target}", kind.operation),
            )),
            result = &mut future => result,
        }
    } else {
        tokio::select! {
            biased;
            _ = &mut cancelled => return Err(DruidError::cancelled(
                kind.operation,
                format!("cancelled during {} {target}", kind.operation),
            )),
            result = &mut future => result,
        }
    };

    outcome.map_err(|err| {
        let message = format!("{} {target} failed: {err}", kind.operation);
        DruidError::wrap(err, kind.code, kind.operation, message)
    })
}
