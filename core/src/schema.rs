//! Consolidation of extension schema patches.
//!
//! Each extension ships a `release-schema.json` merge patch. The
//! [`SchemaResolver`] folds them, in registration order, into one
//! consolidated patch (deletions preserved as `null`), and applies that patch
//! to the standard's schema.

use serde_json::Value;

use crate::error::{ResolveError, Result};
use crate::merge::{PatchTree, merge_patch};

/// Parses a JSON document, keeping object member order.
pub fn parse_json(context: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|source| ResolveError::Json {
        context: context.to_string(),
        source,
    })
}

/// Accumulates extension schema patches.
///
/// # Examples
///
/// ```
/// use ocds_profile_core::SchemaResolver;
/// use serde_json::json;
///
/// let mut resolver = SchemaResolver::new();
/// resolver.add_patch("ppp", r#"{"properties": {"buyer": null}}"#).unwrap();
/// resolver.add_patch("location", r#"{"definitions": {"Location": {"type": "object"}}}"#).unwrap();
///
/// assert_eq!(
///     resolver.release_schema_patch(),
///     json!({"properties": {"buyer": null}, "definitions": {"Location": {"type": "object"}}})
/// );
///
/// let base = json!({"properties": {"buyer": {}, "ocid": {}}, "definitions": {}});
/// assert_eq!(
///     resolver.patched_schema(&base),
///     json!({"properties": {"ocid": {}}, "definitions": {"Location": {"type": "object"}}})
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    patch: PatchTree,
    patches: usize,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `raw` and merges it into the consolidated patch.
    ///
    /// `context` names the patch's origin in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Json`] if `raw` is not valid JSON.
    pub fn add_patch(&mut self, context: &str, raw: &str) -> Result<()> {
        let value = parse_json(&format!("release-schema.json of {context}"), raw)?;
        self.add_patch_value(value);
        Ok(())
    }

    /// Merges an already parsed patch into the consolidated patch.
    pub fn add_patch_value(&mut self, patch: Value) {
        self.patch.merge(PatchTree::from_value(patch));
        self.patches += 1;
        tracing::debug!(patches = self.patches, "merged schema patch");
    }

    /// Returns the number of patches merged so far.
    pub fn len(&self) -> usize {
        self.patches
    }

    pub fn is_empty(&self) -> bool {
        self.patches == 0
    }

    /// Returns the consolidated patch, with extension deletions as `null`.
    pub fn release_schema_patch(&self) -> Value {
        self.patch.clone().into_value()
    }

    /// Applies the consolidated patch to `base`.
    pub fn patched_schema(&self, base: &Value) -> Value {
        let mut schema = base.clone();
        merge_patch(&mut schema, &self.release_schema_patch());
        schema
    }
}
