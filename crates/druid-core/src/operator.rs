//! 组件 Operator 契约。
//!
//! # 教案式说明
//! - **意图（Why）**：外层调谐器按“一种被托管子资源对应一个 Operator”的方式组织调谐，
//!   每个 Operator 暴露相同的四个入口，调谐器无需了解具体资源；
//! - **契约（What）**：
//!   - `get_existing_resource_names`：列出当前已存在的子资源名；
//!   - `trigger_delete`：集群删除时清理子资源；
//!   - `pre_sync`：在任何 Operator 的 `sync` 之前执行的准备动作；
//!   - `sync`：把子资源推向期望状态，可返回 [`DruidError::requeue_after`] 信号；
//! - **风险（Trade-offs）**：Operator 不持有跨调用的状态，每次调用都必须从集群现状重新推导决策。

use std::fmt;

use async_trait::async_trait;

use crate::Result;
use crate::context::OperatorContext;
#[cfg(doc)]
use crate::error::DruidError;
use crate::model::{EtcdCluster, ObjectMeta};

/// Operator 管理的子资源类别，用作注册表键。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum OperatorKind {
    /// 成员 Pod 的滚动替换。
    Pod,
}

impl OperatorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Pod => "pod",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Operator: Send + Sync {
    fn kind(&self) -> OperatorKind;

    async fn get_existing_resource_names(
        &self,
        ctx: &OperatorContext,
        cluster_meta: &ObjectMeta,
    ) -> Result<Vec<String>>;

    async fn trigger_delete(&self, ctx: &OperatorContext, cluster_meta: &ObjectMeta) -> Result<()>;

    async fn pre_sync(&self, ctx: &OperatorContext, cluster: &EtcdCluster) -> Result<()>;

    async fn sync(&self, ctx: &OperatorContext, cluster: &EtcdCluster) -> Result<()>;
}
