//! 结构化日志约定与订阅器安装。
//!
//! # 教案式说明
//! - **意图（Why）**：各组件以相同的字段名输出 `tracing` 事件，日志平台才能按集群、成员聚合；
//! - **契约（What）**：字段名固定为 `cluster`、`pod`、`role`、`score`、`revision`；
//!   [`install_subscriber`] 以 `fmt + EnvFilter` 组装全局订阅器，若进程内已存在全局订阅器则返回错误而不是覆盖；
//! - **风险（Trade-offs）**：库代码只发事件，不主动安装订阅器，安装动作留给二进制入口或测试。

use thiserror::Error;
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
    #[error("invalid log filter `{filter}`: {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// 安装全局 `tracing` 订阅器。
///
/// - `filter` 为 `EnvFilter` 指令，例如 `"info,druid_pod=debug"`；
/// - 环境变量 `RUST_LOG` 存在时优先于 `filter`。
pub fn install_subscriber(filter: &str) -> Result<(), InstallError> {
    if dispatcher::has_been_set() {
        return Err(InstallError::SubscriberAlreadySet);
    }
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|source| InstallError::Filter {
            filter: filter.to_owned(),
            source,
        })?,
    };
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
