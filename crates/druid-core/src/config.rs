//! 控制面配置与特性开关。
//!
//! # 教案式说明
//! - **意图（Why）**：容器名、标签键、重排间隔与退避参数在不同部署中可能不同，集中为一个 TOML 文档；
//! - **契约（What）**：
//!   - 所有字段均有默认值，部分文档合法；
//!   - 未知字段与未知特性开关名视为配置错误，避免拼写错误被静默忽略；
//!   - [`DruidConfig::validate`] 在 `from_toml_str` 中自动执行；
//! - **风险（Trade-offs）**：时长以整秒表达，不支持亚秒精度，调谐节奏不需要更细粒度。

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::BackoffPolicy;

pub const DEFAULT_PRIMARY_CONTAINER: &str = "etcd";
pub const DEFAULT_NAME_LABEL: &str = "app.kubernetes.io/name";
pub const DEFAULT_REVISION_LABEL: &str = "controller-revision-hash";

/// 已知的特性开关。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureGate {
    /// 使用 etcd-wrapper 镜像及其配套配置。
    UseEtcdWrapper,
    /// StatefulSet 采用 `OnDelete` 更新策略，由 Pod 组件负责逐个替换成员。
    UpdateStrategyOnDelete,
}

impl FeatureGate {
    pub const ALL: [FeatureGate; 2] = [
        FeatureGate::UseEtcdWrapper,
        FeatureGate::UpdateStrategyOnDelete,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            FeatureGate::UseEtcdWrapper => "UseEtcdWrapper",
            FeatureGate::UpdateStrategyOnDelete => "UpdateStrategyOnDelete",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|gate| gate.as_str() == name)
    }

    pub const fn default_enabled(&self) -> bool {
        match self {
            FeatureGate::UseEtcdWrapper => true,
            FeatureGate::UpdateStrategyOnDelete => false,
        }
    }
}

impl fmt::Display for FeatureGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 显式设置过的特性开关；未设置的开关取默认值。
///
/// 以开关名为键保存，名称合法性在 [`DruidConfig::validate`] 中检查。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureGates {
    overrides: BTreeMap<String, bool>,
}

impl FeatureGates {
    pub fn is_enabled(&self, gate: FeatureGate) -> bool {
        self.overrides
            .get(gate.as_str())
            .copied()
            .unwrap_or_else(|| gate.default_enabled())
    }

    pub fn set(&mut self, gate: FeatureGate, enabled: bool) {
        self.overrides.insert(gate.as_str().to_owned(), enabled);
    }

    /// 返回第一个无法识别的开关名。
    fn first_unknown(&self) -> Option<&str> {
        self.overrides
            .keys()
            .map(String::as_str)
            .find(|name| FeatureGate::parse(name).is_none())
    }

    pub fn with(mut self, gate: FeatureGate, enabled: bool) -> Self {
        self.set(gate, enabled);
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DruidConfig {
    /// etcd 进程所在容器名，就绪判定只看该容器。
    pub primary_container: String,
    /// 成员发现标签键，值为集群名。
    pub name_label: String,
    /// StatefulSet 写在 Pod 上的修订版本标签键。
    pub revision_label: String,
    /// 收到重排信号后的默认重排间隔。
    pub requeue_after_secs: u64,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    pub feature_gates: FeatureGates,
}

impl Default for DruidConfig {
    fn default() -> Self {
        Self {
            primary_container: DEFAULT_PRIMARY_CONTAINER.to_owned(),
            name_label: DEFAULT_NAME_LABEL.to_owned(),
            revision_label: DEFAULT_REVISION_LABEL.to_owned(),
            requeue_after_secs: 10,
            backoff_base_secs: 1,
            backoff_max_secs: 300,
            feature_gates: FeatureGates::default(),
        }
    }
}

impl DruidConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("primary_container", &self.primary_container),
            ("name_label", &self.name_label),
            ("revision_label", &self.revision_label),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_owned(),
                });
            }
        }
        if let Some(name) = self.feature_gates.first_unknown() {
            return Err(ConfigError::Invalid {
                field: "feature_gates",
                reason: format!("unknown feature gate `{name}`"),
            });
        }
        if self.requeue_after_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "requeue_after_secs",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.backoff_base_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "backoff_base_secs",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(ConfigError::Invalid {
                field: "backoff_max_secs",
                reason: format!(
                    "{} is smaller than backoff_base_secs {}",
                    self.backoff_max_secs, self.backoff_base_secs
                ),
            });
        }
        Ok(())
    }

    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.backoff_base_secs),
            Duration::from_secs(self.backoff_max_secs),
        )
    }

    pub fn is_enabled(&self, gate: FeatureGate) -> bool {
        self.feature_gates.is_enabled(gate)
    }
}
