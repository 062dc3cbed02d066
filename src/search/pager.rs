//! Paginated JQL search.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::api::error::{ApiError, Result};
use crate::api::{Method, Params, SearchPage, SearchReference, Transport};

/// Default number of issues requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Stand-in total until the first page reports the real one.
const TOTAL_SENTINEL: u32 = 1_000_000;

/// Drives the search pagination loop and flattens the pages.
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    search_url: String,
    page_size: u32,
}

impl PageFetcher {
    /// Create a fetcher posting to `search_url` with `page_size` issues per page.
    pub fn new(transport: Arc<dyn Transport>, search_url: impl Into<String>, page_size: u32) -> Self {
        Self {
            transport,
            search_url: search_url.into(),
            page_size: page_size.max(1),
        }
    }

    /// Collect every reference matching `jql`, in server ranking order.
    ///
    /// Pages are requested one at a time. Each page's reported `total` replaces
    /// the previous one; a result set that changes mid-pagination may be
    /// over- or under-collected.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for an empty query. Any page failure aborts the
    /// whole search; no partial results are returned.
    #[instrument(skip(self), fields(page_size = self.page_size))]
    pub async fn search(&self, jql: &str) -> Result<Vec<SearchReference>> {
        if jql.trim().is_empty() {
            return Err(ApiError::InvalidQuery);
        }

        let mut references = Vec::new();
        let mut start_at: u32 = 0;
        let mut total: u32 = TOTAL_SENTINEL;

        debug!("initial start_at = {}", start_at);
        debug!("initial max_results = {}", self.page_size);
        debug!("initial total = {}", total);

        loop {
            let page = self.fetch_page(jql, start_at).await?;

            if total != TOTAL_SENTINEL && page.total != total {
                warn!("Reported total changed from {} to {} during pagination", total, page.total);
            }
            total = page.total;
            references.extend(page.issues);

            debug!("step start_at = {}", start_at);
            debug!("step max_results = {}", self.page_size);
            debug!("step total = {}", total);

            if start_at.saturating_add(self.page_size) >= total {
                debug!("breaking search loop.");
                break;
            }

            start_at += self.page_size;
        }

        info!("Search returned {} issues", references.len());
        Ok(references)
    }

    async fn fetch_page(&self, jql: &str, start_at: u32) -> Result<SearchPage> {
        let mut params = Params::new();
        params.insert("jql".to_string(), json!(jql));
        params.insert("startAt".to_string(), json!(start_at));
        params.insert("maxResults".to_string(), json!(self.page_size));

        let value = self
            .transport
            .send(Method::Post, &self.search_url, &params)
            .await?;

        let page: SearchPage = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Malformed search page: {}", e)))?;
        debug!("search page: {} issues (total: {})", page.issues.len(), page.total);
        Ok(page)
    }
}
