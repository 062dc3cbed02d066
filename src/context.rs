//! The search session shared by every command.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::error::Result;
use crate::api::{SearchReference, ServerUrls, Transport};
use crate::cache::DetailCache;
use crate::config::Settings;
use crate::search::{ConcurrentResolver, IssueView, PageFetcher};

/// Everything a command needs, built once at startup and passed explicitly.
pub struct SearchContext {
    urls: ServerUrls,
    settings: Settings,
    fetcher: PageFetcher,
    cache: Arc<DetailCache>,
}

impl SearchContext {
    /// Wire the page fetcher and detail cache onto one transport.
    pub fn new(transport: Arc<dyn Transport>, urls: ServerUrls, settings: Settings) -> Self {
        let fetcher = PageFetcher::new(Arc::clone(&transport), urls.search_url(), settings.page_size);
        let cache = Arc::new(DetailCache::new(transport, settings.cache_capacity));

        Self {
            urls,
            settings,
            fetcher,
            cache,
        }
    }

    /// Build the URL set described by `settings`.
    pub fn urls_for(settings: &Settings) -> ServerUrls {
        ServerUrls::new(&settings.server, &settings.api_path, &settings.api_version)
    }

    /// Run a JQL search and wrap every hit in a lazy view.
    #[instrument(skip(self))]
    pub async fn search_issues(&self, jql: &str) -> Result<Vec<IssueView>> {
        let references = self.fetcher.search(jql).await?;
        Ok(references
            .into_iter()
            .map(|reference| IssueView::new(reference, Arc::clone(&self.cache)))
            .collect())
    }

    /// A view of a single issue by key, without searching.
    pub fn issue(&self, key: &str) -> IssueView {
        let reference = SearchReference {
            key: key.to_string(),
            self_locator: self.urls.issue_url(key),
        };
        IssueView::new(reference, Arc::clone(&self.cache))
    }

    /// A resolver sized by the configured worker count.
    pub fn resolver(&self) -> ConcurrentResolver {
        ConcurrentResolver::new(self.settings.workers)
    }

    /// The shared detail cache.
    pub fn cache(&self) -> &DetailCache {
        &self.cache
    }

    /// The active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Log cache effectiveness at the end of a run.
    pub fn log_stats(&self) {
        let stats = self.cache.stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            "Detail cache: {:.0}% hit rate",
            stats.hit_percent()
        );
    }
}
