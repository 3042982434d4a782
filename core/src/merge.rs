//! JSON Merge Patch (RFC 7386) with null-preserving accumulation.
//!
//! [`merge_patch`] applies a patch to a document: object members are merged
//! recursively, a `null` member removes the key, and any non-object patch
//! replaces the target outright.
//!
//! Several extension patches are first folded into one consolidated patch.
//! Plain merge-patching would turn an extension's `"buyer": null` into a
//! missing key, which is indistinguishable from "not mentioned". The
//! [`PatchTree`] keeps those deletions as a typed [`PatchTree::Delete`] node
//! while folding, and turns them back into `null` when the consolidated
//! patch is emitted.
//!
//! # Example
//!
//! ```
//! use ocds_profile_core::{PatchTree, merge_patch};
//! use serde_json::json;
//!
//! let mut consolidated = PatchTree::default();
//! consolidated.merge(PatchTree::from_value(json!({"properties": {"buyer": null}})));
//! consolidated.merge(PatchTree::from_value(json!({"definitions": {"Location": {}}})));
//!
//! let patch = consolidated.into_value();
//! assert_eq!(patch["properties"]["buyer"], serde_json::Value::Null);
//!
//! let mut schema = json!({"properties": {"buyer": {}, "tender": {}}});
//! merge_patch(&mut schema, &patch);
//! assert_eq!(schema, json!({"properties": {"tender": {}}, "definitions": {"Location": {}}}));
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Applies `patch` to `target` in place, following RFC 7386.
///
/// Existing keys keep their position; new keys are appended in patch order.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target) = target else {
        return;
    };

    for (key, value) in patch {
        if value.is_null() {
            target.shift_remove(key);
        } else {
            let entry = target.entry(key.clone()).or_insert(Value::Null);
            merge_patch(entry, value);
        }
    }
}

/// Returns the result of applying `patch` to a copy of `target`.
///
/// # Examples
///
/// ```
/// use ocds_profile_core::merged;
/// use serde_json::json;
///
/// assert_eq!(merged(&json!({"a": 1, "b": 2}), &json!({"a": null})), json!({"b": 2}));
/// assert_eq!(
///     merged(&json!({"a": {"d": 4}}), &json!({"a": {"c": 3}})),
///     json!({"a": {"d": 4, "c": 3}})
/// );
/// ```
pub fn merged(target: &Value, patch: &Value) -> Value {
    let mut result = target.clone();
    merge_patch(&mut result, patch);
    result
}

/// A merge patch whose deletions survive being merged with other patches.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchTree {
    /// An explicit `null`: delete this member from the final document.
    Delete,
    /// An object whose members are merged recursively.
    Object(IndexMap<String, PatchTree>),
    /// Any other value, including arrays, which replace wholesale.
    Value(Value),
}

impl Default for PatchTree {
    fn default() -> Self {
        Self::Object(IndexMap::new())
    }
}

impl PatchTree {
    /// Converts a parsed patch, turning every `null` member into
    /// [`PatchTree::Delete`].
    ///
    /// Nulls inside arrays are data, not deletions, and are left as they are.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Delete,
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from_value(value)))
                    .collect(),
            ),
            other => Self::Value(other),
        }
    }

    /// Merges `patch` into this patch.
    ///
    /// Same as RFC 7386 except that a [`PatchTree::Delete`] member is kept as
    /// a value instead of removing the key, so later patches may overwrite it
    /// and it is still present after folding.
    pub fn merge(&mut self, patch: PatchTree) {
        let PatchTree::Object(members) = patch else {
            *self = patch;
            return;
        };

        if !matches!(self, PatchTree::Object(_)) {
            *self = PatchTree::default();
        }
        let PatchTree::Object(target) = self else {
            return;
        };

        for (key, value) in members {
            match target.get_mut(&key) {
                Some(existing) => existing.merge(value),
                None => {
                    target.insert(key, value);
                }
            }
        }
    }

    /// Converts back to JSON, turning [`PatchTree::Delete`] into `null`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Delete => Value::Null,
            Self::Object(members) => Value::Object(
                members
                    .into_iter()
                    .map(|(key, value)| (key, value.into_value()))
                    .collect(),
            ),
            Self::Value(value) => value,
        }
    }
}
