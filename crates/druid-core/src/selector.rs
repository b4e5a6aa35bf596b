//! 等值标签选择器。

use std::collections::BTreeMap;
use std::fmt;

use crate::model::ObjectMeta;

/// 仅支持 `matchLabels` 语义的标签选择器：所有键值对都必须命中。
///
/// - **契约 (What)**：空选择器匹配任意对象；键值比较区分大小写；
/// - **风险 (Trade-offs)**：未实现 `matchExpressions`，成员发现只需要等值匹配。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| meta.label(key) == Some(value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.match_labels {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}
