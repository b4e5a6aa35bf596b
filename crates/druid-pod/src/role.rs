//! 成员角色与驱逐优先级。
//!
//! 成员进程把自己的共识角色写进同名租约的 `holderIdentity`，格式为 `<opaque-id>:<Role>`。
//! 分值越低越先被驱逐：无法识别的角色为 0，Learner 为 1，Member 为 2，Leader 为 3。

use std::fmt;

use druid_core::Lease;

/// 成员在共识中的角色，按驱逐优先级从先到后排列。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberRole {
    /// 租约缺失身份或角色无法识别。
    Unknown,
    /// 尚未取得投票权的学习者。
    Learner,
    /// 有投票权的跟随者。
    Member,
    /// 当前领导者，最后驱逐。
    Leader,
}

impl MemberRole {
    /// 解析 `holderIdentity`。
    ///
    /// 取第一个 `:` 之后、下一个 `:` 之前的片段作为角色；缺少分隔符、为空或无法识别时为
    /// [`MemberRole::Unknown`]。版本错配期间的成员可能写出旧格式，这里不能因此失败。
    pub fn from_holder_identity(holder_identity: Option<&str>) -> Self {
        let Some(identity) = holder_identity else {
            return MemberRole::Unknown;
        };
        match identity.split(':').nth(1) {
            Some("Learner") => MemberRole::Learner,
            Some("Member") => MemberRole::Member,
            Some("Leader") => MemberRole::Leader,
            _ => MemberRole::Unknown,
        }
    }

    /// 从成员租约的 `spec.holderIdentity` 解析角色。
    pub fn from_lease(lease: &Lease) -> Self {
        Self::from_holder_identity(lease.holder_identity())
    }

    /// 驱逐分值，越低越先被驱逐。
    pub const fn score(&self) -> u8 {
        match self {
            MemberRole::Unknown => 0,
            MemberRole::Learner => 1,
            MemberRole::Member => 2,
            MemberRole::Leader => 3,
        }
    }

    /// 与租约中写法一致的角色名。
    pub const fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Unknown => "Unknown",
            MemberRole::Learner => "Learner",
            MemberRole::Member => "Member",
            MemberRole::Leader => "Leader",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
