//! Lazily-resolved issue handles.

use std::sync::Arc;

use tracing::trace;

use crate::api::error::{ApiError, Result};
use crate::api::{DetailDocument, FieldValue, SearchReference};
use crate::cache::DetailCache;

/// Sub-key read from structured values when none is given.
pub const DEFAULT_SUBFIELD: &str = "name";

/// A search hit whose fields are fetched on first access.
///
/// Cloning is cheap: the detail document lives in the shared [`DetailCache`].
#[derive(Clone)]
pub struct IssueView {
    reference: SearchReference,
    cache: Arc<DetailCache>,
}

impl IssueView {
    /// Wrap a reference with the cache that resolves it.
    pub fn new(reference: SearchReference, cache: Arc<DetailCache>) -> Self {
        Self { reference, cache }
    }

    /// The issue key (e.g., "PROJ-123").
    pub fn key(&self) -> &str {
        &self.reference.key
    }

    /// The underlying search reference.
    pub fn reference(&self) -> &SearchReference {
        &self.reference
    }

    /// Resolve a field to a display string.
    ///
    /// Scalar values are returned as-is and `sub` is ignored for them.
    /// Structured values return `sub` if given, otherwise their `name` member.
    ///
    /// # Errors
    ///
    /// - Any error from fetching the detail document
    /// - `UnknownField` if the document lacks `name`
    /// - `UnknownSubfield` if the structured value lacks the requested member
    /// - `UnsupportedValueShape` if the value is neither a string nor an object
    pub async fn field(&self, name: &str, sub: Option<&str>) -> Result<String> {
        let doc = self.cache.get(&self.reference.self_locator).await?;
        self.resolve(&doc, name, sub)
    }

    /// Resolve several fields against one snapshot of the detail document.
    ///
    /// Costs at most one cache lookup regardless of how many fields are read,
    /// so the document cannot be evicted and refetched halfway through.
    pub async fn fields(&self, wanted: &[(&str, Option<&str>)]) -> Result<Vec<String>> {
        let doc = self.cache.get(&self.reference.self_locator).await?;
        wanted
            .iter()
            .map(|(name, sub)| self.resolve(&doc, name, *sub))
            .collect()
    }

    fn resolve(&self, doc: &DetailDocument, name: &str, sub: Option<&str>) -> Result<String> {
        trace!(issue = %self.reference.key, field = name, "Resolving field");

        match doc.field_value(name, &self.reference.self_locator)? {
            FieldValue::Scalar(s) => Ok(s),
            FieldValue::Structured(map) => {
                let sub = sub.unwrap_or(DEFAULT_SUBFIELD);
                map.get(sub).cloned().ok_or_else(|| ApiError::UnknownSubfield {
                    field: name.to_string(),
                    sub: sub.to_string(),
                    value: serde_json::to_value(&map).unwrap_or_default(),
                })
            }
        }
    }
}

impl std::fmt::Debug for IssueView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueView")
            .field("key", &self.reference.key)
            .field("self", &self.reference.self_locator)
            .finish()
    }
}
