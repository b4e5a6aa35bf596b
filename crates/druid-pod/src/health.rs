//! etcd 主容器就绪判定。
//!
//! # 教案式说明
//! - **意图（Why）**：Pod 内除 etcd 进程外还有 backup-restore 等 sidecar；sidecar 未就绪会让
//!   PodDisruptionBudget 拒绝驱逐，但并不代表共识进程有问题，因此健康判定只看主容器；
//! - **契约（What）**：
//!   - [`HealthEvaluator::is_primary_container_ready`]：主容器存在且就绪时为 `true`，缺失时为 `false`；
//!   - [`HealthEvaluator::are_all_primary_containers_ready`]：重新列出集群全部成员，
//!     所有成员的主容器都就绪时为 `true`，列举失败返回 `ERR_LIST_PODS`。

use druid_core::context::run_with_context;
use druid_core::error::LIST_PODS;
use druid_core::{LabelSelector, ObjectMeta, ObjectStore, OperatorContext, Pod, Result};

#[derive(Clone, Debug)]
pub struct HealthEvaluator {
    primary_container: String,
}

impl HealthEvaluator {
    pub fn new(primary_container: impl Into<String>) -> Self {
        Self {
            primary_container: primary_container.into(),
        }
    }

    pub fn is_primary_container_ready(&self, pod: &Pod) -> bool {
        pod.container(&self.primary_container)
            .is_some_and(|status| status.ready)
    }

    pub async fn are_all_primary_containers_ready(
        &self,
        ctx: &OperatorContext,
        store: &dyn ObjectStore,
        cluster_meta: &ObjectMeta,
        selector: &LabelSelector,
    ) -> Result<bool> {
        let pods = run_with_context(
            ctx,
            LIST_PODS,
            &cluster_meta.key(),
            store.list_pods(&cluster_meta.namespace, selector),
        )
        .await?;
        Ok(pods.iter().all(|pod| self.is_primary_container_ready(pod)))
    }
}
