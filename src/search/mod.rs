//! JQL search, lazy issue views, and concurrent resolution.

mod format;
mod pager;
mod resolver;
mod view;

pub use format::{format_issue_detail, format_issue_line, render_outcome, DETAIL_FIELDS};
pub use pager::{PageFetcher, DEFAULT_PAGE_SIZE};
pub use resolver::{resolve_sequential, ConcurrentResolver, ResolutionResult, DEFAULT_WORKERS};
pub use view::{IssueView, DEFAULT_SUBFIELD};
