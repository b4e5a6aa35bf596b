//! 基于内存的对象存储，便于测试与演示回放。
//!
//! # 教案式说明
//! - **意图（Why）**：组件的决策逻辑依赖对象存储的读写结果，集成测试需要一个可预置状态、
//!   可注入失败、可回看写操作序列的存储；
//! - **契约（What）**：
//!   - 写操作（删除、驱逐）无论成败都按调用顺序记录到 [`StoreAction`] 列表；
//!   - 成功的删除与驱逐会把 Pod 从状态中移除，模拟成员进入终止流程；
//!   - `list_pods` 按 `ObjectKey` 排序返回，保证遍历顺序稳定；
//! - **风险（Trade-offs）**：不模拟 StatefulSet 控制器的重建行为，测试需要自行插入替换后的 Pod。

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::{Lease, ObjectKey, Pod, StatefulSet};
use crate::selector::LabelSelector;
use crate::store::{ObjectStore, StoreError};

/// 存储收到的写操作。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreAction {
    Delete(ObjectKey),
    Evict(ObjectKey),
}

#[derive(Default)]
struct MemoryState {
    statefulsets: BTreeMap<ObjectKey, StatefulSet>,
    pods: BTreeMap<ObjectKey, Pod>,
    leases: BTreeMap<ObjectKey, Lease>,
    actions: Vec<StoreAction>,
    list_calls: usize,
    list_failure: Option<(usize, StoreError)>,
    eviction_failure: Option<StoreError>,
    delete_failures: BTreeSet<ObjectKey>,
    lease_failures: BTreeSet<ObjectKey>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<MemoryState>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("InMemoryStore")
            .field("statefulsets", &state.statefulsets.len())
            .field("pods", &state.pods.len())
            .field("leases", &state.leases.len())
            .field("actions", &state.actions.len())
            .finish()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_statefulset(&self, statefulset: StatefulSet) {
        let key = statefulset.metadata.key();
        self.inner.lock().statefulsets.insert(key, statefulset);
    }

    /// 插入或替换 Pod。
    pub fn insert_pod(&self, pod: Pod) {
        let key = pod.key();
        self.inner.lock().pods.insert(key, pod);
    }

    pub fn insert_lease(&self, lease: Lease) {
        let key = lease.metadata.key();
        self.inner.lock().leases.insert(key, lease);
    }

    pub fn pod(&self, key: &ObjectKey) -> Option<Pod> {
        self.inner.lock().pods.get(key).cloned()
    }

    /// 已收到的写操作副本。
    pub fn actions(&self) -> Vec<StoreAction> {
        self.inner.lock().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.inner.lock().actions.clear();
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().list_calls
    }

    /// 第 `from_call` 次（从 1 开始）及之后的 `list_pods` 调用返回 `error`。
    pub fn fail_list_pods(&self, from_call: usize, error: StoreError) {
        self.inner.lock().list_failure = Some((from_call, error));
    }

    /// 所有驱逐请求返回 `error`，典型取值为 [`StoreError::TooManyRequests`]。
    pub fn reject_evictions(&self, error: StoreError) {
        self.inner.lock().eviction_failure = Some(error);
    }

    pub fn fail_delete(&self, key: ObjectKey) {
        self.inner.lock().delete_failures.insert(key);
    }

    pub fn fail_lease(&self, key: ObjectKey) {
        self.inner.lock().lease_failures.insert(key);
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_statefulset(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError> {
        self.inner
            .lock()
            .statefulsets
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "StatefulSet",
                key: key.clone(),
            })
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, StoreError> {
        let mut state = self.inner.lock();
        state.list_calls += 1;
        if let Some((from_call, error)) = &state.list_failure
            && state.list_calls >= *from_call
        {
            return Err(error.clone());
        }
        Ok(state
            .pods
            .values()
            .filter(|pod| pod.namespace() == namespace && selector.matches(&pod.metadata))
            .cloned()
            .collect())
    }

    async fn get_lease(&self, key: &ObjectKey) -> Result<Lease, StoreError> {
        let state = self.inner.lock();
        if state.lease_failures.contains(key) {
            return Err(StoreError::Unavailable(format!("lease {key} unavailable")));
        }
        state
            .leases
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Lease",
                key: key.clone(),
            })
    }

    async fn delete_pod(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        state.actions.push(StoreAction::Delete(key.clone()));
        if state.delete_failures.contains(key) {
            return Err(StoreError::Other(format!("delete of {key} refused")));
        }
        state.pods.remove(key).map(|_| ()).ok_or_else(|| StoreError::NotFound {
            kind: "Pod",
            key: key.clone(),
        })
    }

    async fn evict_pod(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        state.actions.push(StoreAction::Evict(key.clone()));
        if let Some(error) = &state.eviction_failure {
            return Err(error.clone());
        }
        state.pods.remove(key).map(|_| ()).ok_or_else(|| StoreError::NotFound {
            kind: "Pod",
            key: key.clone(),
        })
    }
}
