//! 组件调谐器：依次驱动已注册的 Operator，并把结果映射为重排节奏。
//!
//! # 教案式说明
//! - **意图（Why）**：Operator 只回答“这一轮做了什么”，何时再来由调谐器统一决定；
//!   重排信号代表正常推进，使用固定的短间隔，真正的失败才进入指数退避；
//! - **契约（What）**：
//!   - 带有 [`SUSPEND_RECONCILE_ANNOTATION`] 的集群直接返回 [`ReconcileOutcome::Suspended`]；
//!   - 先对全部 Operator 执行 `pre_sync`，再依次执行 `sync`，遇到第一个错误即停止；
//!   - 连续失败次数按集群计数，成功或重排时清零；
//! - **风险（Trade-offs）**：计数只存在于进程内存，进程重启后退避从头开始。

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use druid_core::{
    BackoffPolicy, DruidConfig, DruidError, EtcdCluster, ObjectKey, ObjectMeta, OperatorContext,
    Result,
};
use parking_lot::Mutex;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::registry::OperatorRegistry;

/// 暂停规格调谐的注解键。
pub const SUSPEND_RECONCILE_ANNOTATION: &str = "druid.gardener.cloud/suspend-etcd-spec-reconcile";

/// 单次调谐的结论。
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// 所有 Operator 均已收敛。
    Done,
    /// 集群带有暂停注解，未执行任何 Operator。
    Suspended,
    /// 推进了一步或正在等待，`after` 之后再来。
    Requeue { after: Duration, reason: String },
    /// 调谐失败，`retry_after` 由连续失败次数推导。
    Failed {
        error: DruidError,
        retry_after: Duration,
    },
}

impl ReconcileOutcome {
    /// 下一次调谐前的等待时间，`Done` 与 `Suspended` 无需安排。
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            ReconcileOutcome::Done | ReconcileOutcome::Suspended => None,
            ReconcileOutcome::Requeue { after, .. } => Some(*after),
            ReconcileOutcome::Failed { retry_after, .. } => Some(*retry_after),
        }
    }
}

pub struct ComponentReconciler {
    registry: OperatorRegistry,
    requeue_after: Duration,
    backoff: BackoffPolicy,
    failures: Mutex<BTreeMap<ObjectKey, u32>>,
}

impl std::fmt::Debug for ComponentReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentReconciler")
            .field("registry", &self.registry)
            .field("requeue_after", &self.requeue_after)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl ComponentReconciler {
    pub fn new(registry: OperatorRegistry, config: &DruidConfig) -> Self {
        Self {
            registry,
            requeue_after: config.requeue_after(),
            backoff: config.backoff(),
            failures: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// 当前连续失败次数。
    pub fn failure_count(&self, cluster: &ObjectKey) -> u32 {
        self.failures.lock().get(cluster).copied().unwrap_or(0)
    }

    pub async fn reconcile(
        &self,
        ctx: &OperatorContext,
        cluster: &EtcdCluster,
    ) -> ReconcileOutcome {
        let key = cluster.key();
        let span = info_span!("reconcile", cluster = %key);
        async {
            if cluster.metadata.has_annotation(SUSPEND_RECONCILE_ANNOTATION) {
                info!("spec reconciliation suspended by annotation");
                return ReconcileOutcome::Suspended;
            }
            let result = self.run_operators(ctx, cluster).await;
            self.settle(&key, result)
        }
        .instrument(span)
        .await
    }

    /// 集群删除时让每个 Operator 清理其子资源，遇到第一个错误即停止。
    pub async fn reconcile_delete(
        &self,
        ctx: &OperatorContext,
        cluster_meta: &ObjectMeta,
    ) -> Result<()> {
        let key = cluster_meta.key();
        let span = info_span!("reconcile_delete", cluster = %key);
        async {
            for operator in self.registry.iter() {
                debug!(operator = %operator.kind(), "triggering delete");
                operator.trigger_delete(ctx, cluster_meta).await?;
            }
            self.failures.lock().remove(&key);
            Ok::<(), DruidError>(())
        }
        .instrument(span)
        .await
    }

    async fn run_operators(&self, ctx: &OperatorContext, cluster: &EtcdCluster) -> Result<()> {
        for operator in self.registry.iter() {
            debug!(operator = %operator.kind(), "pre-sync");
            operator.pre_sync(ctx, cluster).await?;
        }
        for operator in self.registry.iter() {
            debug!(operator = %operator.kind(), "sync");
            operator.sync(ctx, cluster).await?;
        }
        Ok(())
    }

    fn settle(&self, key: &ObjectKey, result: Result<()>) -> ReconcileOutcome {
        let error = match result {
            Ok(()) => {
                self.failures.lock().remove(key);
                return ReconcileOutcome::Done;
            }
            Err(error) => error,
        };

        if let Some(advice) = error.retry_advice() {
            self.failures.lock().remove(key);
            let after = advice.resolve(self.requeue_after);
            let reason = advice.reason().unwrap_or(error.message()).to_owned();
            info!(after_secs = after.as_secs(), reason = %reason, "requeue");
            return ReconcileOutcome::Requeue { after, reason };
        }

        let attempt = {
            let mut failures = self.failures.lock();
            let count = failures.entry(key.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };
        let retry_after = self.backoff.delay_for(attempt, seed_for(key));
        warn!(
            code = error.code(),
            attempt,
            retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "reconcile failed"
        );
        ReconcileOutcome::Failed { error, retry_after }
    }
}

fn seed_for(key: &ObjectKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
