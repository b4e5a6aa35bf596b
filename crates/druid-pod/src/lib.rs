#![deny(unsafe_code)]

//! # druid-pod
//!
//! ## 定位与职责（Why）
//! - StatefulSet 采用 `OnDelete` 更新策略时，新修订版本不会自动落到成员上；本 crate 在每次调谐中
//!   选出至多一个旧版本成员并让其退出，由 StatefulSet 控制器以新修订版本重建；
//! - 优先清理已经失效的成员，其后按 Learner → Member → Leader 的顺序驱逐，尽量推迟触碰 Leader。
//!
//! ## 架构嵌入（Where）
//! - `revision`：按修订版本标签划分成员；
//! - `health`：etcd 主容器就绪判定，忽略 sidecar；
//! - `purge`：直接删除已失效的旧版本成员；
//! - `gate`：已更新成员未全部就绪前阻止进一步扰动；
//! - `role` / `select`：依据成员租约中的角色挑选驱逐对象；
//! - `disruption`：驱逐失败时按集群健康决定是否强制删除；
//! - `operator`：实现 [`druid_core::Operator`]，串联以上步骤。
//!
//! ## 调谐状态（How）
//! 每次 `sync` 从集群现状重新推导，不保存跨调用状态：
//! `已收敛 → 返回` | `清理失效成员 → 重排` | `已更新成员未就绪 → 重排` |
//! `无候选 → 返回` | `驱逐 / 强制删除 → 重排` | `失败 → 致命错误`。

pub mod disruption;
pub mod gate;
pub mod health;
pub mod operator;
pub mod purge;
pub mod revision;
pub mod role;
pub mod select;

pub use disruption::{DisruptionExecutor, DisruptionOutcome, FallbackDecision};
pub use gate::{ReadinessGate, UpdatedMember};
pub use health::HealthEvaluator;
pub use operator::{PodOperator, PodSettings};
pub use purge::{PurgeOutcome, UnhealthyPurger};
pub use revision::{RevisionClassifier, RevisionPartition};
pub use role::MemberRole;
pub use select::{CandidateSelector, ScoredCandidate};
