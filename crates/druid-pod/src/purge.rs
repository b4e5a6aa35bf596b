//! 清理已失效的旧版本成员。
//!
//! 主容器未就绪的旧版本成员不再参与共识，删除它们不会降低集群的可用性；
//! StatefulSet 控制器会以新修订版本重建同名成员。

use druid_core::context::run_with_context;
use druid_core::error::DELETE_POD;
use druid_core::{ObjectStore, OperatorContext, Pod, Result};
use tracing::info;

use crate::health::HealthEvaluator;

/// 一次清理的结果。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// 已提交删除的成员，按输入顺序。
    pub purged: Vec<Pod>,
    /// 主容器就绪、保留下来等待驱逐的旧版本成员。
    pub healthy_outdated: Vec<Pod>,
}

pub struct UnhealthyPurger<'a> {
    store: &'a dyn ObjectStore,
    health: &'a HealthEvaluator,
}

impl<'a> UnhealthyPurger<'a> {
    pub fn new(store: &'a dyn ObjectStore, health: &'a HealthEvaluator) -> Self {
        Self { store, health }
    }

    /// 删除所有主容器未就绪的旧版本成员。
    ///
    /// 任一删除失败立即返回 `ERR_DELETE_POD`，此前已提交的删除不回滚。
    pub async fn purge(&self, ctx: &OperatorContext, outdated: Vec<Pod>) -> Result<PurgeOutcome> {
        let mut outcome = PurgeOutcome::default();
        for pod in outdated {
            if self.health.is_primary_container_ready(&pod) {
                outcome.healthy_outdated.push(pod);
                continue;
            }
            let key = pod.key();
            info!(pod = %key, "deleting outdated member whose primary container is not ready");
            run_with_context(ctx, DELETE_POD, &key, self.store.delete_pod(&key)).await?;
            outcome.purged.push(pod);
        }
        Ok(outcome)
    }
}
