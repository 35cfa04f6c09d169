//! Match rules

use crate::gvk::GroupVersionKind;
use serde::{Deserialize, Serialize};

const WILDCARD: &str = "*";

/// Identity selector used by expansion templates.
///
/// Each set accepts a value when it is empty, contains `"*"`, or contains the
/// value exactly. All three sets must accept for the rule to match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyTo {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub versions: Vec<String>,
}

impl ApplyTo {
    pub fn new<S: Into<String>>(
        groups: impl IntoIterator<Item = S>,
        kinds: impl IntoIterator<Item = S>,
        versions: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            kinds: kinds.into_iter().map(Into::into).collect(),
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, gvk: &GroupVersionKind) -> bool {
        set_accepts(&self.groups, &gvk.group)
            && set_accepts(&self.kinds, &gvk.kind)
            && set_accepts(&self.versions, &gvk.version)
    }
}

pub(crate) fn set_accepts(set: &[String], value: &str) -> bool {
    set.is_empty() || set.iter().any(|s| s == WILDCARD || s == value)
}

/// Match a namespace against an exact name or a trailing-`*` prefix pattern.
pub fn namespace_matches(pattern: &str, namespace: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => namespace.starts_with(prefix),
        None => pattern == namespace,
    }
}
