//! JIRA API client and types.
//!
//! This module provides the transport used to talk to the JIRA REST API and
//! the search/detail response types.

pub mod auth;
mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

pub use auth::Auth;
pub use client::{HttpTransport, Method, Params, ServerUrls, Transport};
pub use error::{ApiError, ErrorKind};
pub use types::{DetailDocument, FieldValue, SearchPage, SearchReference};
