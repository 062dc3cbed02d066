//! Bounded-concurrency field resolution.
//!
//! Fans formatting work for many issues out over a fixed number of workers and
//! reassembles the results in the original search order. A failing issue is
//! recorded against its key and never affects its siblings.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, instrument, warn};

use super::view::IssueView;
use crate::api::error::{ErrorKind, Result};

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 10;

/// The outcome of resolving one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    /// The formatter produced a line.
    Resolved { key: String, line: String },
    /// The formatter failed for this issue.
    Failed {
        key: String,
        kind: ErrorKind,
        message: String,
    },
}

impl ResolutionResult {
    /// The key of the issue this result belongs to.
    pub fn key(&self) -> &str {
        match self {
            ResolutionResult::Resolved { key, .. } | ResolutionResult::Failed { key, .. } => key,
        }
    }

    /// The formatted line, if resolution succeeded.
    pub fn line(&self) -> Option<&str> {
        match self {
            ResolutionResult::Resolved { line, .. } => Some(line),
            ResolutionResult::Failed { .. } => None,
        }
    }

    /// Check if resolution succeeded.
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }

    fn from_outcome(key: &str, outcome: Result<String>) -> Self {
        match outcome {
            Ok(line) => ResolutionResult::Resolved {
                key: key.to_string(),
                line,
            },
            Err(e) => ResolutionResult::Failed {
                key: key.to_string(),
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// Runs a formatter over many views with at most `workers` in flight.
#[derive(Debug, Clone)]
pub struct ConcurrentResolver {
    workers: usize,
}

impl ConcurrentResolver {
    /// Create a resolver with `workers` concurrent slots (minimum one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// The number of concurrent slots.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Format every view concurrently, returning results in input order.
    ///
    /// Views sharing a key are formatted once. Every task runs to completion;
    /// there is no cancellation.
    #[instrument(skip_all, fields(views = views.len(), workers = self.workers))]
    pub async fn resolve_all<F, Fut>(&self, views: &[IssueView], formatter: F) -> Vec<ResolutionResult>
    where
        F: Fn(IssueView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.workers));
        let formatter = Arc::new(formatter);
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, ResolutionResult)>();

        let mut submitted = HashSet::new();
        for view in views {
            if !submitted.insert(view.key().to_string()) {
                continue;
            }

            let tx = tx.clone();
            let permits = Arc::clone(&permits);
            let formatter = Arc::clone(&formatter);
            let view = view.clone();

            tokio::spawn(async move {
                let key = view.key().to_string();
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();

                // Run the formatter in its own task so a panic is contained.
                let result = match tokio::spawn((*formatter)(view)).await {
                    Ok(outcome) => ResolutionResult::from_outcome(&key, outcome),
                    Err(e) => ResolutionResult::Failed {
                        key: key.clone(),
                        kind: ErrorKind::Internal,
                        message: format!("resolution task failed: {}", e),
                    },
                };

                if let ResolutionResult::Failed { message, .. } = &result {
                    warn!(issue = %key, "Failed to resolve issue: {}", message);
                }
                let _ = tx.send((key, result));
            });
        }
        drop(tx);

        let mut outcomes: HashMap<String, ResolutionResult> = HashMap::with_capacity(submitted.len());
        while let Some((key, result)) = rx.recv().await {
            debug!(issue = %key, "Resolution finished ({}/{})", outcomes.len() + 1, submitted.len());
            outcomes.insert(key, result);
        }

        views
            .iter()
            .map(|view| {
                outcomes.get(view.key()).cloned().unwrap_or_else(|| ResolutionResult::Failed {
                    key: view.key().to_string(),
                    kind: ErrorKind::Internal,
                    message: "resolution task produced no result".to_string(),
                })
            })
            .collect()
    }
}

impl Default for ConcurrentResolver {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

/// Format every view one after another, in input order.
pub async fn resolve_sequential<F, Fut>(views: &[IssueView], formatter: F) -> Vec<ResolutionResult>
where
    F: Fn(IssueView) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut results = Vec::with_capacity(views.len());
    for view in views {
        let key = view.key().to_string();
        let outcome = formatter(view.clone()).await;
        if let Err(e) = &outcome {
            warn!(issue = %key, "Failed to resolve issue: {}", e);
        }
        results.push(ResolutionResult::from_outcome(&key, outcome));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::api::mock::MockTransport;
    use crate::api::SearchReference;
    use crate::cache::DetailCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn views(mock: &Arc<MockTransport>, count: usize, capacity: usize) -> Vec<IssueView> {
        let cache = Arc::new(DetailCache::new(mock.clone(), capacity));
        (0..count)
            .map(|i| {
                let key = format!("TEST-{}", i);
                let reference = SearchReference {
                    self_locator: mock.urls().issue_url(&key),
                    key,
                };
                IssueView::new(reference, Arc::clone(&cache))
            })
            .collect()
    }

    /// Later issues finish first.
    fn reversed_delays(count: usize) -> Arc<MockTransport> {
        let mock = MockTransport::with_issues(count);
        let delays: Vec<(String, Duration)> = (0..count)
            .map(|i| {
                let url = mock.urls().issue_url(&format!("TEST-{}", i));
                (url, Duration::from_millis(((count - i) * 5) as u64))
            })
            .collect();
        Arc::new(
            delays
                .into_iter()
                .fold(mock, |mock, (url, delay)| mock.delay(&url, delay)),
        )
    }

    async fn summary_line(view: IssueView) -> Result<String> {
        let summary = view.field("summary", None).await?;
        Ok(format!("{}\t{}", view.key(), summary))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_output_keeps_input_order() {
        let mock = reversed_delays(20);
        let views = views(&mock, 20, 32);

        let results = ConcurrentResolver::new(10)
            .resolve_all(&views, summary_line)
            .await;

        let lines: Vec<&str> = results.iter().filter_map(|r| r.line()).collect();
        let expected: Vec<String> = (0..20)
            .map(|i| format!("TEST-{i}\tSummary of TEST-{i}"))
            .collect();
        assert_eq!(lines, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_failure_is_isolated() {
        let mock = MockTransport::with_issues(5);
        let broken = mock.urls().issue_url("TEST-2");
        let mock = Arc::new(mock.fail(&broken, 1));
        let views = views(&mock, 5, 6);

        let results = ConcurrentResolver::new(3)
            .resolve_all(&views, summary_line)
            .await;

        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.key(), format!("TEST-{}", i));
            assert_eq!(result.is_resolved(), i != 2);
        }
        match &results[2] {
            ResolutionResult::Failed { kind, message, .. } => {
                assert_eq!(*kind, ErrorKind::Transport);
                assert!(message.contains("503"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panicking_formatter_is_isolated() {
        let mock = Arc::new(MockTransport::with_issues(3));
        let views = views(&mock, 3, 6);

        let results = ConcurrentResolver::new(2)
            .resolve_all(&views, |view: IssueView| async move {
                if view.key() == "TEST-1" {
                    panic!("formatter bug");
                }
                Ok(view.key().to_string())
            })
            .await;

        assert_eq!(results[0].line(), Some("TEST-0"));
        assert!(matches!(
            results[1],
            ResolutionResult::Failed { kind: ErrorKind::Internal, .. }
        ));
        assert_eq!(results[2].line(), Some("TEST-2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let mock = Arc::new(MockTransport::with_issues(12));
        let views = views(&mock, 12, 16);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let results = ConcurrentResolver::new(3)
            .resolve_all(&views, move |view: IssueView| {
                let active = Arc::clone(&a);
                let peak = Arc::clone(&p);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(view.key().to_string())
                }
            })
            .await;

        assert!(results.iter().all(ResolutionResult::is_resolved));
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_duplicate_keys_share_result() {
        let mock = Arc::new(MockTransport::with_issues(2));
        let mut views = views(&mock, 2, 6);
        views.push(views[0].clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        let results = ConcurrentResolver::default()
            .resolve_all(&views, move |view: IssueView| {
                c.fetch_add(1, Ordering::SeqCst);
                summary_line(view)
            })
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], results[2]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = ConcurrentResolver::new(4)
            .resolve_all(&[], |_view: IssueView| async { Ok(String::new()) })
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent() {
        let mock = Arc::new(MockTransport::with_issues(8));
        let views = views(&mock, 8, 6);

        let sequential = resolve_sequential(&views, summary_line).await;
        let concurrent = ConcurrentResolver::new(4)
            .resolve_all(&views, summary_line)
            .await;
        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_sequential_records_errors() {
        let mock = Arc::new(MockTransport::with_issues(2));
        let views = views(&mock, 2, 6);

        let results = resolve_sequential(&views, |view: IssueView| async move {
            view.field("nope", None).await
        })
        .await;

        assert!(results.iter().all(|r| matches!(
            r,
            ResolutionResult::Failed { kind: ErrorKind::UnknownField, .. }
        )));
    }

    #[test]
    fn test_from_outcome_error() {
        let result = ResolutionResult::from_outcome("X-1", Err(ApiError::InvalidQuery));
        assert_eq!(result.key(), "X-1");
        assert!(result.line().is_none());
        assert!(!result.is_resolved());
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        assert_eq!(ConcurrentResolver::new(0).workers(), 1);
        assert_eq!(ConcurrentResolver::default().workers(), DEFAULT_WORKERS);
    }
}
