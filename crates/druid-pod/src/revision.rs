//! 按修订版本划分成员。

use druid_core::Pod;

/// 以 Pod 上的修订版本标签与 StatefulSet 的目标修订版本比较。
#[derive(Clone, Debug)]
pub struct RevisionClassifier {
    revision_label: String,
}

/// 划分结果，两个列表都保持输入顺序。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevisionPartition {
    pub updated: Vec<Pod>,
    pub outdated: Vec<Pod>,
}

impl RevisionPartition {
    /// 已更新成员数恰好等于期望副本数时视为收敛。
    pub fn is_converged(&self, desired_replicas: usize) -> bool {
        self.updated.len() == desired_replicas
    }
}

impl RevisionClassifier {
    pub fn new(revision_label: impl Into<String>) -> Self {
        Self {
            revision_label: revision_label.into(),
        }
    }

    /// 缺少标签的成员归入 `outdated`。
    pub fn classify(&self, desired_revision: &str, pods: Vec<Pod>) -> RevisionPartition {
        let (updated, outdated) = pods.into_iter().partition(|pod| {
            pod.metadata.label(&self.revision_label) == Some(desired_revision)
        });
        RevisionPartition { updated, outdated }
    }
}
