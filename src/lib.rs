//! jira-search - a command-line JIRA search client.
//!
//! Searches with JQL, pages through the complete result set, and resolves
//! issue fields lazily through a bounded detail cache, optionally fanning the
//! resolution out over a fixed pool of concurrent workers.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod search;
