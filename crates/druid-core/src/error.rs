//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为组件 Operator 的失败路径提供统一的错误形态：稳定错误码、操作名、面向排障的描述与底层原因；
//! - 将“请稍后重新调谐”这一控制流信号与真正的失败区分开，外层调谐器据此选择短暂重排或退避重试。
//!
//! ## 设计要求（What）
//! - 错误码为 `'static` 字符串，集中声明于 [`codes`]；
//! - 每个错误都带 [`ErrorCategory`]，未显式设置时为 [`ErrorCategory::Fatal`]；
//! - 底层原因通过 `source()` 暴露，日志可以沿错误链打印完整上下文。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::retry::RetryAdvice;

/// 稳定错误码。
pub mod codes {
    pub const ERR_GET_STATEFULSET: &str = "ERR_GET_STATEFULSET";
    pub const ERR_LIST_PODS: &str = "ERR_LIST_PODS";
    pub const ERR_DELETE_POD: &str = "ERR_DELETE_POD";
    pub const ERR_EVICT_POD: &str = "ERR_EVICT_POD";
    pub const ERR_GET_LEASE: &str = "ERR_GET_LEASE";
    /// 控制流信号而非失败：要求外层调谐器稍后再次调用。
    pub const ERR_REQUEUE_AFTER: &str = "ERR_REQUEUE_AFTER";
    pub const ERR_CANCELLED: &str = "ERR_CANCELLED";
    pub const ERR_DEADLINE_EXCEEDED: &str = "ERR_DEADLINE_EXCEEDED";
}

/// 底层原因的装箱表示，保持 `Send + Sync` 以便跨任务传播。
pub type ErrorCause = Box<dyn StdError + Send + Sync + 'static>;

/// 错误分类，驱动外层调谐器的处置策略。
///
/// - `Requeue`：非失败，按 [`RetryAdvice`] 稍后重排；
/// - `Fatal`：本轮调谐失败，由外层按退避策略重试；
/// - `Cancelled` / `Timeout`：调用方主动取消或截止时间到期，本轮立即结束。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    Requeue(RetryAdvice),
    Fatal,
    Cancelled,
    Timeout,
}

/// 组件 Operator 的统一错误。
///
/// # 教案式说明
/// - **意图 (Why)**：原始失败（对象存储报错、取消）需要附带“哪个操作、哪个成员”的上下文才能排障，
///   同时保留稳定错误码供事件与告警聚合；
/// - **契约 (What)**：
///   - `code` 取自 [`codes`]；`operation` 为动作名，如 `Get`、`Evict`；
///   - `message` 包含集群或成员标识；
///   - `cause` 为可选底层原因，经由 `source()` 暴露；
/// - **执行 (How)**：Builder 风格的 `with_*` 方法叠加原因与分类，所有方法按值返回新实例。
#[derive(Debug, Error)]
#[error("[{code}] {operation}: {message}")]
pub struct DruidError {
    code: &'static str,
    operation: Cow<'static, str>,
    message: String,
    #[source]
    cause: Option<ErrorCause>,
    category: ErrorCategory,
}

impl DruidError {
    /// 构造致命错误。
    pub fn new(
        code: &'static str,
        operation: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            operation: operation.into(),
            message: message.into(),
            cause: None,
            category: ErrorCategory::Fatal,
        }
    }

    /// 包装底层错误，等价于 `new(..).with_cause(cause)`。
    pub fn wrap(
        cause: impl StdError + Send + Sync + 'static,
        code: &'static str,
        operation: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, operation, message).with_cause(cause)
    }

    /// 构造“稍后重新调谐”信号。
    ///
    /// - **契约 (What)**：`reason` 必须是人类可读的说明，它同时写入消息与 [`RetryAdvice`]；
    ///   信号不携带具体延迟，节奏由外层调谐器决定。
    pub fn requeue_after(
        operation: impl Into<Cow<'static, str>>,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        let advice = RetryAdvice::unspecified().with_reason(reason.clone());
        Self::new(codes::ERR_REQUEUE_AFTER, operation, reason)
            .with_category(ErrorCategory::Requeue(advice))
    }

    pub fn cancelled(operation: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(codes::ERR_CANCELLED, operation, message)
            .with_category(ErrorCategory::Cancelled)
    }

    pub fn deadline_exceeded(
        operation: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(codes::ERR_DEADLINE_EXCEEDED, operation, message)
            .with_category(ErrorCategory::Timeout)
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> &ErrorCategory {
        &self.category
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// 是否为“稍后重新调谐”信号。
    pub fn is_requeue(&self) -> bool {
        matches!(self.category, ErrorCategory::Requeue(_))
    }

    /// 是否因取消或截止时间而中断。
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self.category,
            ErrorCategory::Cancelled | ErrorCategory::Timeout
        )
    }

    /// 重排建议；仅 `Requeue` 分类返回 `Some`。
    pub fn retry_advice(&self) -> Option<&RetryAdvice> {
        match &self.category {
            ErrorCategory::Requeue(advice) => Some(advice),
            _ => None,
        }
    }
}

/// 一次对象存储操作对应的稳定错误码与动作名。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationKind {
    pub code: &'static str,
    pub operation: &'static str,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.operation, self.code)
    }
}

pub const GET_STATEFULSET: OperationKind = OperationKind {
    code: codes::ERR_GET_STATEFULSET,
    operation: "Get",
};
pub const LIST_PODS: OperationKind = OperationKind {
    code: codes::ERR_LIST_PODS,
    operation: "List",
};
pub const DELETE_POD: OperationKind = OperationKind {
    code: codes::ERR_DELETE_POD,
    operation: "Delete",
};
pub const EVICT_POD: OperationKind = OperationKind {
    code: codes::ERR_EVICT_POD,
    operation: "Evict",
};
pub const GET_LEASE: OperationKind = OperationKind {
    code: codes::ERR_GET_LEASE,
    operation: "Get",
};
