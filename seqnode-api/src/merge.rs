//! Merge policies for in-place cache updates.
//!
//! An update is read-modify-write under one key: the provider reads the
//! existing entry, asks the policy for a replacement and writes it back only
//! if the policy produced one.

use seqnode_core::{CacheEntry, CacheError};
use serde_json::Value;

use crate::config::MergePolicyKind;

/// Strategy for combining a cached entry with update data.
pub trait MergePolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the entry to store, or `None` to leave the cache untouched.
    fn merge(&self, existing: &CacheEntry, update: &Value) -> Result<Option<CacheEntry>, CacheError>;
}

/// Ignores the update and keeps the cached entry as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepExisting;

impl MergePolicy for KeepExisting {
    fn name(&self) -> &'static str {
        "keep-existing"
    }

    fn merge(&self, _existing: &CacheEntry, _update: &Value) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }
}

/// Replaces the cached content with the update, keeping the hub session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceContent;

impl MergePolicy for ReplaceContent {
    fn name(&self) -> &'static str {
        "replace-content"
    }

    fn merge(&self, existing: &CacheEntry, update: &Value) -> Result<Option<CacheEntry>, CacheError> {
        existing.with_content(update.clone()).map(Some)
    }
}

/// Applies the update to the cached content as a JSON merge patch (RFC 7386).
#[derive(Debug, Clone, Copy, Default)]
pub struct MergePatch;

impl MergePolicy for MergePatch {
    fn name(&self) -> &'static str {
        "merge-patch"
    }

    fn merge(&self, existing: &CacheEntry, update: &Value) -> Result<Option<CacheEntry>, CacheError> {
        let mut content = existing.sequence_node_content().clone();
        merge_patch(&mut content, update);
        existing.with_content(content).map(Some)
    }
}

/// RFC 7386: objects merge recursively, `null` removes a member, anything
/// else replaces the target outright.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_members) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    if let Value::Object(target_members) = target {
        for (name, value) in patch_members {
            if value.is_null() {
                target_members.remove(name);
            } else {
                merge_patch(
                    target_members.entry(name.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

/// Policy instance for a configured kind.
pub fn policy_for(kind: MergePolicyKind) -> Box<dyn MergePolicy> {
    match kind {
        MergePolicyKind::KeepExisting => Box::new(KeepExisting),
        MergePolicyKind::ReplaceContent => Box::new(ReplaceContent),
        MergePolicyKind::MergePatch => Box::new(MergePatch),
    }
}
