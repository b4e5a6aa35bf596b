//! 挑选本轮驱逐的成员。

use druid_core::context::run_with_context;
use druid_core::error::GET_LEASE;
use druid_core::{ObjectStore, OperatorContext, Pod, Result};
use tracing::debug;

use crate::role::MemberRole;

/// 候选成员及其角色。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoredCandidate {
    /// 被选中的旧版本成员。
    pub pod: Pod,
    /// 从同名租约解析出的角色。
    pub role: MemberRole,
}

impl ScoredCandidate {
    /// 角色对应的驱逐分值。
    pub fn score(&self) -> u8 {
        self.role.score()
    }
}

pub struct CandidateSelector<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// 读取每个成员的同名租约，返回分值最低者；分值相同时保留先出现的成员。
    ///
    /// 任一租约读取失败返回 `ERR_GET_LEASE`，不做部分选择。输入为空时返回 `None`。
    pub async fn select(
        &self,
        ctx: &OperatorContext,
        pods: &[Pod],
    ) -> Result<Option<ScoredCandidate>> {
        let mut best: Option<ScoredCandidate> = None;
        for pod in pods {
            let key = pod.key();
            let lease = run_with_context(ctx, GET_LEASE, &key, self.store.get_lease(&key)).await?;
            let role = MemberRole::from_lease(&lease);
            debug!(pod = %key, role = %role, score = role.score(), "scored eviction candidate");
            if best.as_ref().is_none_or(|current| role.score() < current.score()) {
                best = Some(ScoredCandidate {
                    pod: pod.clone(),
                    role,
                });
            }
        }
        Ok(best)
    }
}
