//! 对象存储契约。
//!
//! # 教案式说明
//! - **意图（Why）**：组件 Operator 只需要 Pod / StatefulSet / Lease 的少量读写能力，
//!   将其抽象为 Trait 后，生产环境可接入真实 API 客户端，测试环境注入内存实现；
//! - **契约（What）**：所有方法均为命名空间作用域；失败以 [`StoreError`] 表达，
//!   乐观并发冲突以 [`StoreError::Conflict`] 原样返回，不在实现内部重试；
//! - **风险（Trade-offs）**：Trait 使用 `async_trait` 装箱 Future，换取对象安全，
//!   单次调谐只有少量调用，分配开销可以忽略。

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Lease, ObjectKey, Pod, StatefulSet};
use crate::selector::LabelSelector;

/// 对象存储返回的底层错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// 目标对象不存在。
    #[error("{kind} `{key}` not found")]
    NotFound { kind: &'static str, key: ObjectKey },

    /// 资源版本冲突，调用方需在下一轮调谐中基于最新状态重新决策。
    #[error("conflict on {kind} `{key}`: {detail}")]
    Conflict {
        kind: &'static str,
        key: ObjectKey,
        detail: String,
    },

    /// 服务端拒绝请求，典型场景是 PodDisruptionBudget 阻止驱逐（HTTP 429）。
    #[error("request rejected for `{key}`: {detail}")]
    TooManyRequests { key: ObjectKey, detail: String },

    /// 服务端不可达或超时。
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// 组件 Operator 依赖的对象存储能力。
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_statefulset(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError>;

    /// 列出命名空间内命中选择器的全部 Pod，顺序由实现决定但需稳定。
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, StoreError>;

    async fn get_lease(&self, key: &ObjectKey) -> Result<Lease, StoreError>;

    /// 无条件删除 Pod，不经过 PodDisruptionBudget。
    async fn delete_pod(&self, key: &ObjectKey) -> Result<(), StoreError>;

    /// 通过 `eviction` 子资源请求优雅驱逐，受 PodDisruptionBudget 约束。
    async fn evict_pod(&self, key: &ObjectKey) -> Result<(), StoreError>;
}
