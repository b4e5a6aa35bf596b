//! 控制面读取与操作的最小对象模型。
//!
//! # 教案式说明
//! - **意图（Why）**：组件只关心 Pod、StatefulSet、Lease 与 Etcd 自定义资源中与滚动编排相关的字段，
//!   完整的 Kubernetes 类型树对本工作区而言过重；
//! - **契约（What）**：字段名遵循 API Server 的 camelCase 线格式，未知字段在反序列化时被忽略，
//!   因此真实的 API 负载可以直接解析为这些结构；
//! - **风险（Trade-offs）**：模型为只读快照，不携带 `resourceVersion` 冲突检测，冲突语义由存储实现负责。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 命名空间内对象的唯一定位键。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// 对象元数据，只保留调谐逻辑需要的字段。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// 追加一条标签并返回自身，便于构造测试夹具。
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotations.contains_key(key)
    }
}

/// 容器就绪状态。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

/// etcd 集群中的单个成员副本。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            metadata,
            status: PodStatus::default(),
        }
    }

    /// 追加容器状态，保持插入顺序。
    pub fn with_container(mut self, name: impl Into<String>, ready: bool) -> Self {
        self.status.container_statuses.push(ContainerStatus {
            name: name.into(),
            ready,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// 查找指定名称的容器状态。
    pub fn container(&self, name: &str) -> Option<&ContainerStatus> {
        self.status
            .container_statuses
            .iter()
            .find(|status| status.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub current_revision: String,
    #[serde(default)]
    pub update_revision: String,
}

/// 承载成员 Pod 的 StatefulSet，仅读取其目标修订版本。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSet {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: StatefulSetStatus,
}

impl StatefulSet {
    pub fn update_revision(&self) -> &str {
        &self.status.update_revision
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_identity: Option<String>,
}

/// 成员进程自行维护的成员租约，`holderIdentity` 形如 `<opaque-id>:<Role>`。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: LeaseSpec,
}

impl Lease {
    pub fn new(metadata: ObjectMeta, holder_identity: Option<String>) -> Self {
        Self {
            metadata,
            spec: LeaseSpec { holder_identity },
        }
    }

    pub fn holder_identity(&self) -> Option<&str> {
        self.spec.holder_identity.as_deref()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdSpec {
    #[serde(default)]
    pub replicas: i32,
}

/// 被托管的 etcd 集群声明。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdCluster {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: EtcdSpec,
}

impl EtcdCluster {
    pub fn new(metadata: ObjectMeta, replicas: i32) -> Self {
        Self {
            metadata,
            spec: EtcdSpec { replicas },
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// 期望副本数；负值按 0 处理。
    pub fn desired_replicas(&self) -> usize {
        usize::try_from(self.spec.replicas).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_deserializes_from_api_payload() {
        let payload = r#"{
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "etcd-main-0",
                "namespace": "shoot",
                "labels": {"controller-revision-hash": "etcd-main-7c9"},
                "uid": "ignored"
            },
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {"name": "etcd", "ready": true, "restartCount": 0},
                    {"name": "backup-restore", "ready": false}
                ]
            }
        }"#;
        let pod: Pod = serde_json::from_str(payload).expect("pod payload");
        assert_eq!(pod.key(), ObjectKey::new("shoot", "etcd-main-0"));
        assert_eq!(
            pod.metadata.label("controller-revision-hash"),
            Some("etcd-main-7c9")
        );
        assert!(pod.container("etcd").is_some_and(|c| c.ready));
        assert!(pod.container("backup-restore").is_some_and(|c| !c.ready));
    }

    #[test]
    fn statefulset_status_reads_revisions() {
        let payload = r#"{
            "metadata": {"name": "etcd-main", "namespace": "shoot"},
            "status": {
                "replicas": 3,
                "currentRevision": "etcd-main-7c9",
                "updateRevision": "etcd-main-5d4"
            }
        }"#;
        let sts: StatefulSet = serde_json::from_str(payload).expect("statefulset payload");
        assert_eq!(sts.status.replicas, 3);
        assert_eq!(sts.status.current_revision, "etcd-main-7c9");
        assert_eq!(sts.update_revision(), "etcd-main-5d4");

        let fresh: StatefulSet =
            serde_json::from_str(r#"{"metadata":{"name":"etcd-main"}}"#).unwrap();
        assert_eq!(fresh.update_revision(), "");
    }

    #[test]
    fn lease_without_holder_identity_is_none() {
        let lease: Lease =
            serde_json::from_str(r#"{"metadata":{"name":"etcd-main-0"},"spec":{}}"#).unwrap();
        assert_eq!(lease.holder_identity(), None);
    }

    #[test]
    fn negative_replicas_clamp_to_zero() {
        let cluster = EtcdCluster::new(ObjectMeta::new("ns", "etcd"), -1);
        assert_eq!(cluster.desired_replicas(), 0);
    }
}
