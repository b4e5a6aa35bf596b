//! 扰动前的就绪闸门。
//!
//! # 教案式说明
//! - **意图（Why）**：一次只让一个成员离开；上一个被替换的成员尚未恢复时再驱逐下一个，
//!   可能让集群失去多数派；
//! - **契约（What）**：
//!   - 输入为已更新成员，以及本轮刚被清理、仍在等待重建的成员（`pending_removal = true`）；
//!   - 存在任何待重建成员或任何未就绪的已更新成员时返回重排信号，消息列出阻塞成员；
//!   - 全部通过时返回 `Ok(())`；
//! - **风险（Trade-offs）**：待重建成员以显式标记表达，不依赖其就绪状态碰巧为 `false`。

use druid_core::{DruidError, Pod, Result};

use crate::health::HealthEvaluator;

/// 闸门检查的对象：已运行新修订版本的成员，或本轮刚被清理的成员。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatedMember {
    pub pod: Pod,
    /// 本轮已提交删除、等待 StatefulSet 控制器重建。
    pub pending_removal: bool,
}

impl UpdatedMember {
    /// 按当前就绪状态参与检查的已更新成员。
    pub fn current(pod: Pod) -> Self {
        Self {
            pod,
            pending_removal: false,
        }
    }

    /// 无论就绪与否都会阻塞闸门的待重建成员。
    pub fn pending_removal(pod: Pod) -> Self {
        Self {
            pod,
            pending_removal: true,
        }
    }
}

pub struct ReadinessGate<'a> {
    health: &'a HealthEvaluator,
}

impl<'a> ReadinessGate<'a> {
    pub fn new(health: &'a HealthEvaluator) -> Self {
        Self { health }
    }

    pub fn check(&self, members: &[UpdatedMember]) -> Result<()> {
        let pending: Vec<&str> = members
            .iter()
            .filter(|member| member.pending_removal)
            .map(|member| member.pod.name())
            .collect();
        if !pending.is_empty() {
            return Err(DruidError::requeue_after(
                "Gate",
                format!(
                    "deleted unhealthy outdated pods [{}], waiting for their replacements",
                    pending.join(", ")
                ),
            ));
        }

        let unready: Vec<&str> = members
            .iter()
            .filter(|member| !self.health.is_primary_container_ready(&member.pod))
            .map(|member| member.pod.name())
            .collect();
        if !unready.is_empty() {
            return Err(DruidError::requeue_after(
                "Gate",
                format!("updated pods [{}] are not ready yet", unready.join(", ")),
            ));
        }
        Ok(())
    }
}
