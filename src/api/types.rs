//! JIRA API request and response types.
//!
//! These types model the search and issue-detail responses. Detail fields are
//! kept as raw JSON and interpreted on demand, since the API mixes bare string
//! values with small objects such as `{"name": ..., "id": ...}`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ApiError, Result};

/// A minimal pointer to an issue, as returned by a search page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchReference {
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// The REST locator of the full issue document.
    #[serde(rename = "self")]
    pub self_locator: String,
}

impl fmt::Display for SearchReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// One page of search results.
///
/// Returned by `POST {api}/search`. Issue entries carry more than key and
/// locator, but nothing else is needed before the detail fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// The references on this page.
    #[serde(default)]
    pub issues: Vec<SearchReference>,
    /// Total number of matching issues, as reported for this page.
    pub total: u32,
}

/// The full field document of one issue.
///
/// Returned by `GET` on a [`SearchReference::self_locator`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailDocument {
    /// Field name to raw field entry (`{"value": ...}`).
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// The value of a single detail field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A bare string value.
    Scalar(String),
    /// A small object of sub-keys, e.g. a user or a status.
    Structured(HashMap<String, String>),
}

impl DetailDocument {
    /// Look up a field and classify its declared `value`.
    ///
    /// `locator` is only used for error context.
    pub fn field_value(&self, name: &str, locator: &str) -> Result<FieldValue> {
        let entry = self.fields.get(name).ok_or_else(|| ApiError::UnknownField {
            field: name.to_string(),
            locator: locator.to_string(),
        })?;

        let value = entry.get("value").unwrap_or(entry);
        FieldValue::from_json(name, value)
    }
}

impl FieldValue {
    /// Classify a raw JSON field value.
    ///
    /// Objects keep their scalar members rendered as strings; nested objects
    /// and arrays inside them are dropped.
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(FieldValue::Scalar(s.clone())),
            serde_json::Value::Object(map) => Ok(FieldValue::Structured(
                map.iter()
                    .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
                    .collect(),
            )),
            other => Err(ApiError::UnsupportedValueShape {
                field: field.to_string(),
                value: other.clone(),
            }),
        }
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
