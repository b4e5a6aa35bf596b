//! `PodOperator::sync` 的端到端行为：基于内存对象存储预置集群状态，观察每轮调谐的返回值与写操作序列。

use std::sync::Arc;
use std::time::Duration;

use druid_core::memory::{InMemoryStore, StoreAction};
use druid_core::{
    Cancellation, Deadline, EtcdCluster, LabelSelector, Lease, ObjectKey, ObjectMeta, ObjectStore, Operator,
    OperatorContext, Pod, StatefulSet, StoreError, async_trait, codes,
};
use druid_pod::{PodOperator, PodSettings};

const NS: &str = "shoot--dev";
const CLUSTER: &str = "etcd-main";
const OLD: &str = "rev-1";
const NEW: &str = "rev-2";

fn cluster(replicas: i32) -> EtcdCluster {
    EtcdCluster::new(ObjectMeta::new(NS, CLUSTER), replicas)
}

fn statefulset(update_revision: &str) -> StatefulSet {
    let mut sts = StatefulSet {
        metadata: ObjectMeta::new(NS, CLUSTER),
        ..StatefulSet::default()
    };
    sts.status.update_revision = update_revision.to_owned();
    sts
}

fn key(ordinal: usize) -> ObjectKey {
    ObjectKey::new(NS, format!("{CLUSTER}-{ordinal}"))
}

fn member(ordinal: usize, revision: &str, etcd_ready: bool) -> Pod {
    Pod::new(
        ObjectMeta::new(NS, format!("{CLUSTER}-{ordinal}"))
            .with_label("app.kubernetes.io/name", CLUSTER)
            .with_label("controller-revision-hash", revision),
    )
    .with_container("etcd", etcd_ready)
    .with_container("backup-restore", true)
}

fn lease(ordinal: usize, holder_identity: Option<&str>) -> Lease {
    Lease::new(
        ObjectMeta::new(NS, format!("{CLUSTER}-{ordinal}")),
        holder_identity.map(str::to_owned),
    )
}

/// 预置 StatefulSet，以及一组 `(修订版本, 主容器就绪, 租约 holderIdentity)` 描述的成员。
fn seeded(members: &[(&str, bool, Option<&str>)]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_statefulset(statefulset(NEW));
    for (ordinal, (revision, ready, identity)) in members.iter().enumerate() {
        store.insert_pod(member(ordinal, revision, *ready));
        store.insert_lease(lease(ordinal, *identity));
    }
    store
}

fn pod_operator(store: Arc<dyn ObjectStore>) -> PodOperator {
    PodOperator::new(store, PodSettings::default())
}

#[tokio::test]
async fn converged_cluster_is_left_untouched() {
    let store = seeded(&[
        (NEW, true, Some("a:Leader")),
        (NEW, true, Some("b:Member")),
        (NEW, true, Some("c:Member")),
    ]);
    let operator = pod_operator(store.clone());

    operator
        .sync(&OperatorContext::new(), &cluster(3))
        .await
        .expect("converged cluster needs no action");
    assert!(store.actions().is_empty());
}

#[tokio::test]
async fn unready_outdated_member_is_purged_before_any_eviction() {
    let store = seeded(&[
        (OLD, false, Some("a:Learner")),
        (OLD, true, Some("b:Member")),
        (NEW, true, Some("c:Leader")),
    ]);
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(3))
        .await
        .unwrap_err();
    assert!(err.is_requeue(), "{err}");
    assert!(err.message().contains("etcd-main-0"));
    assert_eq!(store.actions(), [StoreAction::Delete(key(0))]);
}

#[tokio::test]
async fn failed_purge_reports_delete_error() {
    let store = seeded(&[(OLD, false, None), (NEW, true, None)]);
    store.fail_delete(key(0));
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(2))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ERR_DELETE_POD);
    assert!(!err.is_requeue());
}

#[tokio::test]
async fn unready_updated_member_blocks_disruption() {
    let store = seeded(&[
        (NEW, false, Some("a:Member")),
        (OLD, true, Some("b:Learner")),
        (OLD, true, Some("c:Leader")),
    ]);
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(3))
        .await
        .unwrap_err();
    assert!(err.is_requeue());
    assert!(err.message().contains("etcd-main-0"));
    assert!(store.actions().is_empty());
}

#[tokio::test]
async fn learner_is_evicted_before_member_and_leader() {
    let store = seeded(&[
        (OLD, true, Some("a:Leader")),
        (OLD, true, Some("b:Member")),
        (OLD, true, Some("c:Learner")),
    ]);
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(3))
        .await
        .unwrap_err();
    assert!(err.is_requeue());
    assert!(err.message().contains("shoot--dev/etcd-main-2 is evicted"));
    assert_eq!(store.actions(), [StoreAction::Evict(key(2))]);
}

#[tokio::test]
async fn equal_scores_keep_first_listed_member() {
    let store = seeded(&[
        (OLD, true, Some("a:Leader")),
        (OLD, true, Some("b:Member")),
        (OLD, true, Some("c:Member")),
    ]);
    let operator = pod_operator(store.clone());

    let _ = operator.sync(&OperatorContext::new(), &cluster(3)).await;
    assert_eq!(store.actions(), [StoreAction::Evict(key(1))]);
}

#[tokio::test]
async fn malformed_lease_identity_is_evicted_first() {
    let store = seeded(&[
        (OLD, true, Some("a:Learner")),
        (OLD, true, Some("Leader")),
        (OLD, true, Some("c:Member")),
    ]);
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(3))
        .await
        .unwrap_err();
    assert!(err.is_requeue());
    assert_eq!(store.actions(), [StoreAction::Evict(key(1))]);
}

#[tokio::test]
async fn lease_read_failure_aborts_selection() {
    let store = seeded(&[(OLD, true, Some("a:Learner")), (OLD, true, Some("b:Leader"))]);
    store.fail_lease(key(1));
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(2))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ERR_GET_LEASE);
    assert!(store.actions().is_empty());
}

#[tokio::test]
async fn blocked_eviction_falls_back_to_delete_when_all_primaries_ready() {
    let store = seeded(&[(OLD, true, Some("a:Leader")), (OLD, true, Some("b:Learner"))]);
    store.reject_evictions(StoreError::TooManyRequests {
        key: key(1),
        detail: "disruption budget exhausted".into(),
    });
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(2))
        .await
        .unwrap_err();
    assert!(err.is_requeue(), "{err}");
    assert!(err.message().contains("eviction was rejected"));
    assert_eq!(
        store.actions(),
        [StoreAction::Evict(key(1)), StoreAction::Delete(key(1))]
    );
}

/// 驱逐被拒绝的同时另一个成员失效，复查会看到未就绪成员。
struct DegradeOnRejectedEviction {
    inner: InMemoryStore,
    degraded: Pod,
}

#[async_trait]
impl ObjectStore for DegradeOnRejectedEviction {
    async fn get_statefulset(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError> {
        self.inner.get_statefulset(key).await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, StoreError> {
        self.inner.list_pods(namespace, selector).await
    }

    async fn get_lease(&self, key: &ObjectKey) -> Result<Lease, StoreError> {
        self.inner.get_lease(key).await
    }

    async fn delete_pod(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.inner.delete_pod(key).await
    }

    async fn evict_pod(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let result = self.inner.evict_pod(key).await;
        if result.is_err() {
            self.inner.insert_pod(self.degraded.clone());
        }
        result
    }
}

#[tokio::test]
async fn blocked_eviction_with_degraded_cluster_reports_evict_error() {
    let inner = InMemoryStore::new();
    inner.insert_statefulset(statefulset(NEW));
    for (ordinal, identity) in ["a:Leader", "b:Learner"].into_iter().enumerate() {
        inner.insert_pod(member(ordinal, OLD, true));
        inner.insert_lease(lease(ordinal, Some(identity)));
    }
    inner.reject_evictions(StoreError::TooManyRequests {
        key: key(1),
        detail: "disruption budget exhausted".into(),
    });
    let store = Arc::new(DegradeOnRejectedEviction {
        inner,
        degraded: member(0, OLD, false),
    });
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(2))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ERR_EVICT_POD);
    assert!(!err.is_requeue());
    let source = std::error::Error::source(&err).expect("eviction error kept as source");
    assert!(source.to_string().contains("disruption budget exhausted"));
    assert_eq!(store.inner.actions(), [StoreAction::Evict(key(1))]);
}

#[tokio::test]
async fn blocked_eviction_with_failed_recheck_reports_list_error() {
    let store = seeded(&[(OLD, true, Some("a:Leader")), (OLD, true, Some("b:Learner"))]);
    store.reject_evictions(StoreError::TooManyRequests {
        key: key(1),
        detail: "disruption budget exhausted".into(),
    });
    store.fail_list_pods(2, StoreError::Unavailable("apiserver down".into()));
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(2))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ERR_LIST_PODS);
    assert_eq!(store.actions(), [StoreAction::Evict(key(1))]);
}

#[tokio::test]
async fn missing_statefulset_is_reported() {
    let store = Arc::new(InMemoryStore::new());
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(3))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ERR_GET_STATEFULSET);
    assert_eq!(store.list_calls(), 0);
}

#[tokio::test]
async fn unobserved_update_revision_requeues_without_listing() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_statefulset(statefulset(""));
    store.insert_pod(member(0, OLD, true));
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(1))
        .await
        .unwrap_err();
    assert!(err.is_requeue());
    assert_eq!(store.list_calls(), 0);
    assert!(store.actions().is_empty());
}

#[tokio::test]
async fn list_failure_is_reported() {
    let store = seeded(&[(OLD, true, None)]);
    store.fail_list_pods(1, StoreError::Unavailable("apiserver down".into()));
    let operator = pod_operator(store.clone());

    let err = operator
        .sync(&OperatorContext::new(), &cluster(1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ERR_LIST_PODS);
}

#[tokio::test]
async fn repeated_sync_on_unchanged_state_repeats_decision() {
    let store = seeded(&[(NEW, false, None), (OLD, true, Some("b:Learner"))]);
    let operator = pod_operator(store.clone());
    let ctx = OperatorContext::new();

    let first = operator.sync(&ctx, &cluster(2)).await.unwrap_err();
    let second = operator.sync(&ctx, &cluster(2)).await.unwrap_err();
    assert_eq!(first.message(), second.message());
    assert!(store.actions().is_empty());
}

#[tokio::test]
async fn cancelled_context_issues_no_calls() {
    let store = seeded(&[(OLD, true, Some("a:Learner"))]);
    let operator = pod_operator(store.clone());
    let cancellation = Cancellation::new();
    cancellation.cancel();
    let ctx = OperatorContext::new().with_cancellation(cancellation);

    let err = operator.sync(&ctx, &cluster(1)).await.unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(store.list_calls(), 0);
    assert!(store.actions().is_empty());
}

/// 驱逐请求发出后迟迟没有应答；可选地在请求期间触发取消。
struct StalledEviction {
    inner: InMemoryStore,
    cancel_on_evict: Option<Cancellation>,
}

#[async_trait]
impl ObjectStore for StalledEviction {
    async fn get_statefulset(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError> {
        self.inner.get_statefulset(key).await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, StoreError> {
        self.inner.list_pods(namespace, selector).await
    }

    async fn get_lease(&self, key: &ObjectKey) -> Result<Lease, StoreError> {
        self.inner.get_lease(key).await
    }

    async fn delete_pod(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.inner.delete_pod(key).await
    }

    async fn evict_pod(&self, key: &ObjectKey) -> Result<(), StoreError> {
        if let Some(cancellation) = &self.cancel_on_evict {
            cancellation.cancel();
        }
        tokio::time::sleep(Duration::from_secs(3600)).await;
        self.inner.evict_pod(key).await
    }
}

fn stalled(cancel_on_evict: Option<Cancellation>) -> Arc<StalledEviction> {
    let inner = InMemoryStore::new();
    inner.insert_statefulset(statefulset(NEW));
    for (ordinal, identity) in ["a:Leader", "b:Learner"].into_iter().enumerate() {
        inner.insert_pod(member(ordinal, OLD, true));
        inner.insert_lease(lease(ordinal, Some(identity)));
    }
    Arc::new(StalledEviction {
        inner,
        cancel_on_evict,
    })
}

#[tokio::test]
async fn cancellation_during_eviction_skips_fallback_delete() {
    let cancellation = Cancellation::new();
    let store = stalled(Some(cancellation.clone()));
    let operator = pod_operator(store.clone());
    let ctx = OperatorContext::new().with_cancellation(cancellation);

    let err = operator.sync(&ctx, &cluster(2)).await.unwrap_err();
    assert!(err.is_interrupted(), "{err}");
    assert_eq!(err.code(), codes::ERR_CANCELLED);
    assert!(err.message().contains("etcd-main-1"));
    assert!(store.inner.actions().is_empty());
    assert_eq!(store.inner.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_during_eviction_skips_fallback_delete() {
    let store = stalled(None);
    let operator = pod_operator(store.clone());
    let ctx = OperatorContext::new().with_deadline(Deadline::after(Duration::from_secs(30)));

    let err = operator.sync(&ctx, &cluster(2)).await.unwrap_err();
    assert!(err.is_interrupted(), "{err}");
    assert_eq!(err.code(), codes::ERR_DEADLINE_EXCEEDED);
    assert!(
        !store
            .inner
            .actions()
            .iter()
            .any(|action| matches!(action, StoreAction::Delete(_)))
    );
    assert_eq!(store.inner.list_calls(), 1);
}

#[tokio::test]
async fn rolls_every_member_one_at_a_time() {
    let store = seeded(&[
        (OLD, true, Some("a:Leader")),
        (OLD, true, Some("b:Learner")),
        (OLD, true, Some("c:Member")),
    ]);
    let operator = pod_operator(store.clone());
    let ctx = OperatorContext::new();
    let mut evicted = Vec::new();

    for _ in 0..10 {
        match operator.sync(&ctx, &cluster(3)).await {
            Ok(()) => break,
            Err(err) => assert!(err.is_requeue(), "{err}"),
        }
        if let Some(StoreAction::Evict(key)) = store.actions().last().cloned() {
            store.clear_actions();
            let ordinal: usize = key.name.rsplit('-').next().and_then(|n| n.parse().ok()).unwrap();
            evicted.push(ordinal);
            // StatefulSet 控制器以新修订版本重建成员，先未就绪，下一轮再就绪。
            store.insert_pod(member(ordinal, NEW, false));
            let blocked = operator.sync(&ctx, &cluster(3)).await.unwrap_err();
            assert!(blocked.is_requeue());
            assert!(store.actions().is_empty());
            store.insert_pod(member(ordinal, NEW, true));
        }
    }

    assert_eq!(evicted, [1, 2, 0]);
    operator.sync(&ctx, &cluster(3)).await.unwrap();
}
