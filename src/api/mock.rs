//! Scripted in-memory transport for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::{Method, Params, ServerUrls, Transport};
use super::error::{ApiError, Result};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub params: Params,
}

/// Serves search pages over a fixed list of issues plus their detail documents.
pub struct MockTransport {
    urls: ServerUrls,
    references: Vec<(String, String)>,
    details: HashMap<String, Value>,
    /// Reported `total` per search call; falls back to the real count.
    totals: Vec<u32>,
    failures: Mutex<HashMap<String, usize>>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            urls: test_urls(),
            references: Vec::new(),
            details: HashMap::new(),
            totals: Vec::new(),
            failures: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A server holding `count` issues `TEST-0..TEST-{count-1}` with sample details.
    pub fn with_issues(count: usize) -> Self {
        (0..count).fold(Self::new(), |mock, i| {
            let key = format!("TEST-{}", i);
            let detail = sample_detail(&key);
            mock.issue(&key, detail)
        })
    }

    /// Add an issue with the given detail document.
    pub fn issue(mut self, key: &str, detail: Value) -> Self {
        let locator = self.urls.issue_url(key);
        self.references.push((key.to_string(), locator.clone()));
        self.details.insert(locator, detail);
        self
    }

    /// Add a search hit whose locator is shared with another issue.
    pub fn alias(mut self, key: &str, locator: &str) -> Self {
        self.references.push((key.to_string(), locator.to_string()));
        self
    }

    /// Report these totals on successive search calls.
    pub fn totals(mut self, totals: Vec<u32>) -> Self {
        self.totals = totals;
        self
    }

    /// Fail the next `times` requests to `url`.
    pub fn fail(self, url: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    /// Delay every response for `url`.
    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn urls(&self) -> &ServerUrls {
        &self.urls
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn search_requests(&self) -> usize {
        let search_url = self.urls.search_url();
        self.count(|r| r.url == search_url)
    }

    pub fn fetches_of(&self, url: &str) -> usize {
        self.count(|r| r.url == url)
    }

    pub fn detail_fetches(&self) -> usize {
        let search_url = self.urls.search_url();
        self.count(|r| r.url != search_url)
    }

    fn count(&self, pred: impl Fn(&RecordedRequest) -> bool) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| pred(r)).count()
    }

    fn search_page(&self, params: &Params, call: usize) -> Value {
        let start = params.get("startAt").and_then(Value::as_u64).unwrap_or(0) as usize;
        let max = params.get("maxResults").and_then(Value::as_u64).unwrap_or(50) as usize;
        let total = self
            .totals
            .get(call)
            .copied()
            .unwrap_or(self.references.len() as u32);

        let issues: Vec<Value> = self
            .references
            .iter()
            .skip(start)
            .take(max)
            .map(|(key, locator)| json!({"key": key, "self": locator, "fields": {}}))
            .collect();

        json!({"startAt": start, "maxResults": max, "total": total, "issues": issues})
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, method: Method, url: &str, params: &Params) -> Result<Value> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                params: params.clone(),
            });
            requests.iter().filter(|r| r.url == url).count() - 1
        };

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ApiError::ServerError(format!("HTTP 503: {}", url)));
                }
            }
        }

        if url == self.urls.search_url() {
            assert_eq!(method, Method::Post, "search must be POSTed");
            return Ok(self.search_page(params, call));
        }

        self.details
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(url.to_string()))
    }
}

pub fn test_urls() -> ServerUrls {
    ServerUrls::new("http://localhost", "/rest/api/", "2.0.alpha1")
}

/// A detail document with the fields the line formatter reads.
pub fn sample_detail(key: &str) -> Value {
    json!({
        "fields": {
            "summary": {"value": format!("Summary of {}", key)},
            "priority": {"value": {"name": "Major", "id": "3"}},
            "status": {"value": {"name": "Open", "id": "1"}},
            "assignee": {"value": {"name": "jdoe", "displayName": "Jane Doe"}}
        }
    })
}
