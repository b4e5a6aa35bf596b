//! 成员 Pod 的 Operator 实现。
//!
//! # 教案式说明
//! - **意图（Why）**：把修订版本划分、失效成员清理、就绪闸门、候选挑选与扰动执行串成一次调谐，
//!   每次调用至多扰动一个健康成员；
//! - **契约（What）**：
//!   - 对象存储通过构造函数注入，Operator 自身不保存跨调用状态；
//!   - `sync` 的返回值：`Ok(())` 表示已收敛或没有可驱逐的成员；重排信号表示已推进一步或正在等待；
//!     其它错误携带稳定错误码；
//!   - `pre_sync`、`trigger_delete`、`get_existing_resource_names` 对成员 Pod 无事可做，
//!     Pod 的创建与删除由 StatefulSet 控制器负责；
//! - **风险（Trade-offs）**：两次调谐之间集群可能变化，所有决策都基于本轮读取的快照。

use std::sync::Arc;

use async_trait::async_trait;
use druid_core::config::{DEFAULT_NAME_LABEL, DEFAULT_PRIMARY_CONTAINER, DEFAULT_REVISION_LABEL};
use druid_core::context::run_with_context;
use druid_core::error::{GET_STATEFULSET, LIST_PODS};
use druid_core::{
    DruidConfig, DruidError, EtcdCluster, LabelSelector, ObjectMeta, ObjectStore, Operator,
    OperatorContext, OperatorKind, Result,
};
use tracing::{Instrument, debug, info, info_span};

use crate::disruption::DisruptionExecutor;
use crate::gate::{ReadinessGate, UpdatedMember};
use crate::health::HealthEvaluator;
use crate::purge::UnhealthyPurger;
use crate::revision::RevisionClassifier;
use crate::select::CandidateSelector;

/// 成员识别相关的名字。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodSettings {
    /// etcd 进程所在容器。
    pub primary_container: String,
    /// 值为集群名的成员标签。
    pub name_label: String,
    /// 记录成员修订版本的标签。
    pub revision_label: String,
}

impl Default for PodSettings {
    fn default() -> Self {
        Self {
            primary_container: DEFAULT_PRIMARY_CONTAINER.to_owned(),
            name_label: DEFAULT_NAME_LABEL.to_owned(),
            revision_label: DEFAULT_REVISION_LABEL.to_owned(),
        }
    }
}

impl PodSettings {
    pub fn from_config(config: &DruidConfig) -> Self {
        Self {
            primary_container: config.primary_container.clone(),
            name_label: config.name_label.clone(),
            revision_label: config.revision_label.clone(),
        }
    }
}

pub struct PodOperator {
    store: Arc<dyn ObjectStore>,
    settings: PodSettings,
    health: HealthEvaluator,
    classifier: RevisionClassifier,
}

impl std::fmt::Debug for PodOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodOperator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PodOperator {
    pub fn new(store: Arc<dyn ObjectStore>, settings: PodSettings) -> Self {
        let health = HealthEvaluator::new(settings.primary_container.clone());
        let classifier = RevisionClassifier::new(settings.revision_label.clone());
        Self {
            store,
            settings,
            health,
            classifier,
        }
    }

    /// 选出属于该集群的全部成员。
    pub fn member_selector(&self, cluster_meta: &ObjectMeta) -> LabelSelector {
        LabelSelector::new().with(self.settings.name_label.clone(), cluster_meta.name.clone())
    }

    async fn roll(&self, ctx: &OperatorContext, cluster: &EtcdCluster) -> Result<()> {
        let key = cluster.key();
        let statefulset =
            run_with_context(ctx, GET_STATEFULSET, &key, self.store.get_statefulset(&key)).await?;
        let desired_revision = statefulset.update_revision();
        if desired_revision.is_empty() {
            return Err(DruidError::requeue_after(
                "Sync",
                format!("update revision of StatefulSet {key} is not yet observed"),
            ));
        }

        let members = self.member_selector(&cluster.metadata);
        let pods = run_with_context(
            ctx,
            LIST_PODS,
            &key,
            self.store.list_pods(&key.namespace, &members),
        )
        .await?;

        let partition = self.classifier.classify(desired_revision, pods);
        let desired_replicas = cluster.desired_replicas();
        if partition.is_converged(desired_replicas) {
            debug!(
                revision = desired_revision,
                replicas = desired_replicas,
                "all members run the update revision"
            );
            return Ok(());
        }
        info!(
            revision = desired_revision,
            updated = partition.updated.len(),
            outdated = partition.outdated.len(),
            "rolling outdated members"
        );

        let purge = UnhealthyPurger::new(self.store.as_ref(), &self.health)
            .purge(ctx, partition.outdated)
            .await?;

        let updated: Vec<UpdatedMember> = partition
            .updated
            .into_iter()
            .map(UpdatedMember::current)
            .chain(purge.purged.into_iter().map(UpdatedMember::pending_removal))
            .collect();
        ReadinessGate::new(&self.health).check(&updated)?;

        let Some(candidate) = CandidateSelector::new(self.store.as_ref())
            .select(ctx, &purge.healthy_outdated)
            .await?
        else {
            debug!("no healthy outdated member left to disrupt");
            return Ok(());
        };

        let outcome = DisruptionExecutor::new(self.store.as_ref(), &self.health)
            .execute(ctx, &cluster.metadata, &members, &candidate)
            .await?;
        Err(outcome.into_requeue())
    }
}

#[async_trait]
impl Operator for PodOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Pod
    }

    async fn get_existing_resource_names(
        &self,
        _ctx: &OperatorContext,
        _cluster_meta: &ObjectMeta,
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn trigger_delete(
        &self,
        _ctx: &OperatorContext,
        _cluster_meta: &ObjectMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn pre_sync(&self, _ctx: &OperatorContext, _cluster: &EtcdCluster) -> Result<()> {
        Ok(())
    }

    async fn sync(&self, ctx: &OperatorContext, cluster: &EtcdCluster) -> Result<()> {
        let span = info_span!("pod_sync", cluster = %cluster.key());
        self.roll(ctx, cluster).instrument(span).await
    }
}
