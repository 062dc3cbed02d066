//! Output line rendering for search results.

use tracing::debug;

use super::resolver::ResolutionResult;
use super::view::IssueView;
use crate::api::error::{ErrorKind, Result};

/// Fields of a search result line, as (field, sub-key).
const LINE_FIELDS: &[(&str, Option<&str>)] = &[
    ("summary", None),
    ("priority", None),
    ("status", None),
    ("assignee", Some("displayName")),
];

/// Fields shown by `show`, as (label, field, sub-key).
pub const DETAIL_FIELDS: &[(&str, &str, Option<&str>)] = &[
    ("Summary", "summary", None),
    ("Type", "issuetype", None),
    ("Status", "status", None),
    ("Priority", "priority", None),
    ("Assignee", "assignee", Some("displayName")),
    ("Reporter", "reporter", Some("displayName")),
];

/// Render one search hit as `key, summary, priority, status, assignee`.
///
/// All four fields are read from one cached document.
pub async fn format_issue_line(view: IssueView) -> Result<String> {
    let values = view.fields(LINE_FIELDS).await?;
    Ok(format!("{}\t{}", view.key(), values.join("\t")))
}

/// Render a resolution outcome; failures keep their slot with an error marker.
pub fn render_outcome(result: &ResolutionResult) -> String {
    match result {
        ResolutionResult::Resolved { line, .. } => line.clone(),
        ResolutionResult::Failed { key, message, .. } => format!("{}\t<error: {}>", key, message),
    }
}

/// Render the detail lines for `show`. Missing fields are skipped.
pub async fn format_issue_detail(view: &IssueView) -> Result<Vec<String>> {
    let mut lines = vec![format!("Key: {}", view.key())];

    for (label, field, sub) in DETAIL_FIELDS {
        match view.field(field, *sub).await {
            Ok(value) => lines.push(format!("{}: {}", label, value)),
            Err(e) if is_data_contract(e.kind()) => debug!("Skipping {}: {}", field, e),
            Err(e) => return Err(e),
        }
    }

    Ok(lines)
}

fn is_data_contract(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnknownField | ErrorKind::UnknownSubfield | ErrorKind::UnsupportedValueShape
    )
}
