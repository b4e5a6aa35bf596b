use std::fmt;
use std::sync::Arc;

use druid_core::{Operator, OperatorKind};
use thiserror::Error;

/// 注册 Operator 时可能遇到的错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// 同一类别只允许注册一个 Operator。
    #[error("operator `{kind}` already registered")]
    Duplicate { kind: OperatorKind },
}

/// `OperatorRegistry` 维护调谐器可见的组件 Operator 目录。
///
/// # 教案级注释
/// - **目标 (Why)**
///   - 在装配阶段集中登记所有组件 Operator，类别冲突在注册时即被捕获；
/// - **设计要点 (How)**
///   - 按注册顺序保存条目，调谐器依此顺序依次执行 `pre_sync` 与 `sync`；
///   - 条目以 `Arc<dyn Operator>` 保存，可在多个调谐任务间共享；
/// - **契约 (What)**
///   - 重复注册同一 [`OperatorKind`] 返回 [`RegistrationError::Duplicate`]，注册表保持不变。
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    entries: Vec<Arc<dyn Operator>>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, operator: Arc<dyn Operator>) -> Result<(), RegistrationError> {
        let kind = operator.kind();
        if self.get(kind).is_some() {
            return Err(RegistrationError::Duplicate { kind });
        }
        self.entries.push(operator);
        Ok(())
    }

    pub fn get(&self, kind: OperatorKind) -> Option<&Arc<dyn Operator>> {
        self.entries.iter().find(|operator| operator.kind() == kind)
    }

    /// 按注册顺序遍历。
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Operator>> {
        self.entries.iter()
    }

    pub fn kinds(&self) -> impl Iterator<Item = OperatorKind> + '_ {
        self.entries.iter().map(|operator| operator.kind())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
