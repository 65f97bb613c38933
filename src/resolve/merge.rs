//! Specificity merge and duplicate handling for include and define lists.

use crate::ast::{Platform, SettingKey, TargetDecl};

/// How repeated entries are treated when lists are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep the first occurrence only.
    #[default]
    Unique,
    /// Keep every occurrence in merge order.
    Append,
}

/// An ordered list that applies a [`MergePolicy`] on every push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedList {
    policy: MergePolicy,
    items: Vec<String>,
}

impl MergedList {
    /// An empty list with `policy`.
    #[must_use]
    pub const fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            items: Vec::new(),
        }
    }

    /// Append `item` unless the policy drops it as a duplicate.
    pub fn push(&mut self, item: impl Into<String>) {
        let value: String = item.into();
        if self.policy == MergePolicy::Unique && self.items.contains(&value) {
            return;
        }
        self.items.push(value);
    }

    /// Push every item in order.
    pub fn extend<I>(&mut self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for item in items {
            self.push(item);
        }
    }

    /// Rewrite every item, then push it again so the policy sees the
    /// rewritten value.
    pub fn rewrite(&mut self, mut f: impl FnMut(&str) -> Option<String>) {
        for item in std::mem::take(&mut self.items) {
            let rewritten = f(&item).unwrap_or(item);
            self.push(rewritten);
        }
    }

    /// The merged items.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// Values of `key` declared by `target`, gathered from least to most
/// specific scope for `platform` and `configuration`.
///
/// Missing scopes contribute nothing.
pub fn scoped_values<'t>(
    target: &'t TargetDecl,
    platform: &Platform,
    configuration: &str,
    key: SettingKey,
) -> Vec<&'t str> {
    platform
        .specificity_scopes(configuration)
        .iter()
        .filter_map(|scope| target.setting(scope, key))
        .flat_map(|values| values.iter())
        .collect()
}
