#![deny(unsafe_code)]

//! # druid-core
//!
//! ## 定位与职责（Why）
//! - 为 etcd 集群控制面中的各组件 Operator 提供共享契约：对象模型、对象存储抽象、
//!   调用上下文、错误语义与配置；
//! - 组件实现（如 `druid-pod`）只依赖本 crate 暴露的 Trait 与类型，存储客户端通过构造器注入，
//!   不存在进程级全局句柄。
//!
//! ## 架构嵌入（Where）
//! - `model` / `selector`：与 Kubernetes 线格式对齐的最小对象模型；
//! - `store`：对象存储契约 [`ObjectStore`] 及其错误；
//! - `context`：取消令牌与截止时间；
//! - `error` / `retry`：稳定错误码、错误分类与退避建议；
//! - `operator`：组件 Operator 契约；
//! - `config` / `observability`：配置加载与 `tracing` 订阅器安装。
//!
//! ## Feature 策略（Trade-offs）
//! - `test-util` 打开内存版对象存储 `memory::InMemoryStore`，仅供测试复用，不进入生产依赖图。

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod observability;
pub mod operator;
pub mod retry;
pub mod selector;
pub mod store;

#[cfg(feature = "test-util")]
pub mod memory;

pub use async_trait::async_trait;
pub use config::{ConfigError, DruidConfig, FeatureGate, FeatureGates};
pub use context::{Cancellation, Deadline, OperatorContext};
pub use error::{DruidError, ErrorCategory, codes};
pub use model::{EtcdCluster, Lease, ObjectKey, ObjectMeta, Pod, StatefulSet};
pub use operator::{Operator, OperatorKind};
pub use retry::{BackoffPolicy, RetryAdvice};
pub use selector::LabelSelector;
pub use store::{ObjectStore, StoreError};

/// 统一结果别名，默认错误类型为 [`DruidError`]。
pub type Result<T, E = DruidError> = core::result::Result<T, E>;
