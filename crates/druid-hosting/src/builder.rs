use std::fmt;
use std::sync::Arc;

use druid_core::{ConfigError, DruidConfig, FeatureGate, ObjectStore, Operator};
use druid_pod::{PodOperator, PodSettings};
use thiserror::Error;
use tracing::debug;

use crate::reconciler::ComponentReconciler;
use crate::registry::{OperatorRegistry, RegistrationError};

/// 装配阶段的错误。
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("operator registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

/// `ReconcilerBuilder` 聚合配置、对象存储与组件 Operator 的装配步骤。
///
/// # 教案级注释
/// - **关键流程 (How)**
///   1. `from_config`：校验配置，并按特性开关登记内置 Operator；
///   2. `register`：追加额外的 Operator，类别冲突立即报错；
///   3. `build`：打包为 [`ComponentReconciler`]。
/// - **契约说明 (What)**
///   - 成员 Pod 的滚动替换只在 `UpdateStrategyOnDelete` 开启时登记，
///     未开启时 StatefulSet 自行滚动，不应再有组件触碰成员；
///   - 对象存储在此处注入一次，所有内置 Operator 共享同一句柄。
pub struct ReconcilerBuilder {
    config: DruidConfig,
    store: Arc<dyn ObjectStore>,
    registry: OperatorRegistry,
}

impl fmt::Debug for ReconcilerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcilerBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ReconcilerBuilder {
    pub fn from_config(
        config: DruidConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let mut builder = Self {
            config,
            store,
            registry: OperatorRegistry::new(),
        };
        if builder.config.is_enabled(FeatureGate::UpdateStrategyOnDelete) {
            let pod = PodOperator::new(
                Arc::clone(&builder.store),
                PodSettings::from_config(&builder.config),
            );
            builder.register(Arc::new(pod))?;
        } else {
            debug!(
                gate = %FeatureGate::UpdateStrategyOnDelete,
                "feature gate disabled, pod operator not registered"
            );
        }
        Ok(builder)
    }

    pub fn register(&mut self, operator: Arc<dyn Operator>) -> Result<&mut Self, BuildError> {
        self.registry.register(operator)?;
        Ok(self)
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn build(self) -> ComponentReconciler {
        ComponentReconciler::new(self.registry, &self.config)
    }
}
