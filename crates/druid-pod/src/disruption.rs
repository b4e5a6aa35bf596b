//! 驱逐候选成员，驱逐被拒绝时按集群健康决定是否强制删除。
//!
//! # 教案式说明
//! - **意图（Why）**：PodDisruptionBudget 会把 sidecar 未就绪的成员也视作不健康，从而拒绝驱逐；
//!   若此时所有成员的 etcd 主容器其实都已就绪，滚动更新不应被 sidecar 卡死；
//! - **契约（What）**：
//!
//!   | 驱逐结果 | 复查集群健康 | 动作 |
//!   |---|---|---|
//!   | 成功 | 不复查 | [`DisruptionOutcome::Evicted`] |
//!   | 被取消或超时 | 不复查 | 原样传播 |
//!   | 其它失败 | 全部就绪 | 强制删除，[`DisruptionOutcome::ForceDeleted`] |
//!   | 其它失败 | 存在未就绪 | `ERR_EVICT_POD`，驱逐错误作为 `source()` |
//!   | 其它失败 | 复查失败 | 复查错误原样传播 |
//!
//! - **风险（Trade-offs）**：强制删除绕过了 PodDisruptionBudget，因此只在复查确认主容器全部就绪后执行。

use std::fmt;

use druid_core::codes::ERR_EVICT_POD;
use druid_core::context::run_with_context;
use druid_core::error::{DELETE_POD, EVICT_POD};
use druid_core::{
    DruidError, LabelSelector, ObjectKey, ObjectMeta, ObjectStore, OperatorContext, Result,
};
use tracing::{info, warn};

use crate::health::HealthEvaluator;
use crate::select::ScoredCandidate;

/// 一次扰动的结果，两种结果都意味着需要稍后重新调谐。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisruptionOutcome {
    Evicted { pod: ObjectKey },
    ForceDeleted { pod: ObjectKey },
}

impl DisruptionOutcome {
    pub fn pod(&self) -> &ObjectKey {
        match self {
            DisruptionOutcome::Evicted { pod } | DisruptionOutcome::ForceDeleted { pod } => pod,
        }
    }

    /// 转换为携带说明的重排信号。
    pub fn into_requeue(self) -> DruidError {
        DruidError::requeue_after("Disrupt", self.to_string())
    }
}

impl fmt::Display for DisruptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisruptionOutcome::Evicted { pod } => write!(f, "pod {pod} is evicted"),
            DisruptionOutcome::ForceDeleted { pod } => write!(
                f,
                "pod {pod} is deleted after its eviction was rejected while all primary containers are ready"
            ),
        }
    }
}

/// 驱逐被拒绝后的处置。
#[derive(Debug)]
pub enum FallbackDecision {
    ForceDelete,
    Abort(DruidError),
}

impl FallbackDecision {
    /// 由驱逐错误与集群健康复查结果决定处置。
    pub fn decide(pod: &ObjectKey, rejection: DruidError, cluster_ready: Result<bool>) -> Self {
        match cluster_ready {
            Ok(true) => FallbackDecision::ForceDelete,
            Ok(false) => FallbackDecision::Abort(
                DruidError::new(
                    ERR_EVICT_POD,
                    EVICT_POD.operation,
                    format!(
                        "eviction of pod {pod} was rejected and not all primary containers are ready"
                    ),
                )
                .with_cause(rejection),
            ),
            Err(recheck) => FallbackDecision::Abort(recheck),
        }
    }
}

pub struct DisruptionExecutor<'a> {
    store: &'a dyn ObjectStore,
    health: &'a HealthEvaluator,
}

impl<'a> DisruptionExecutor<'a> {
    pub fn new(store: &'a dyn ObjectStore, health: &'a HealthEvaluator) -> Self {
        Self { store, health }
    }

    pub async fn execute(
        &self,
        ctx: &OperatorContext,
        cluster_meta: &ObjectMeta,
        members: &LabelSelector,
        candidate: &ScoredCandidate,
    ) -> Result<DisruptionOutcome> {
        let pod = candidate.pod.key();
        info!(
            pod = %pod,
            role = %candidate.role,
            score = candidate.score(),
            "evicting outdated member"
        );

        let rejection =
            match run_with_context(ctx, EVICT_POD, &pod, self.store.evict_pod(&pod)).await {
                Ok(()) => return Ok(DisruptionOutcome::Evicted { pod }),
                Err(err) if err.is_interrupted() => return Err(err),
                Err(err) => err,
            };

        warn!(pod = %pod, error = %rejection, "eviction rejected, rechecking primary containers");
        let cluster_ready = self
            .health
            .are_all_primary_containers_ready(ctx, self.store, cluster_meta, members)
            .await;

        match FallbackDecision::decide(&pod, rejection, cluster_ready) {
            FallbackDecision::ForceDelete => {
                warn!(pod = %pod, "all primary containers are ready, deleting pod directly");
                run_with_context(ctx, DELETE_POD, &pod, self.store.delete_pod(&pod)).await?;
                Ok(DisruptionOutcome::ForceDeleted { pod })
            }
            FallbackDecision::Abort(err) => Err(err),
        }
    }
}
