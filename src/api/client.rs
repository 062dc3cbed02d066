//! HTTP transport for the JIRA REST API.
//!
//! This module provides the request primitive every other component builds on:
//! an authenticated `send(method, url, params)` returning the decoded JSON body.
//! Failures are reported on the first attempt; nothing is retried.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::auth::Auth;
use super::error::{ApiError, Result};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Request parameters: a query string for GET, a JSON body for POST.
pub type Params = serde_json::Map<String, Value>;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            _ => Err(ApiError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// An authenticated request/response primitive.
///
/// Implementations must be safe to share across tasks; reads are stateless.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and decode the JSON response body.
    async fn send(&self, method: Method, url: &str, params: &Params) -> Result<Value>;
}

/// Endpoint URLs for one JIRA server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrls {
    server: String,
    api_base: String,
}

impl ServerUrls {
    /// Build the URL set for `server`, e.g. `http://jira` + `/rest/api/` + `2.0.alpha1`.
    pub fn new(server: &str, api_path: &str, api_version: &str) -> Self {
        let server = normalize_base_url(server);
        let api_base = format!("{}{}{}", server, api_path, api_version);
        Self { server, api_base }
    }

    /// The normalized server URL.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The versioned REST API base.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The JQL search endpoint.
    pub fn search_url(&self) -> String {
        format!("{}/search", self.api_base)
    }

    /// The detail locator of a single issue.
    pub fn issue_url(&self, key: &str) -> String {
        format!("{}/issue/{}", self.api_base, urlencoding::encode(key))
    }

    /// The session login endpoint.
    pub fn session_url(&self) -> String {
        format!("{}/rest/auth/1/session", self.server)
    }

    /// Whether credentials travel over TLS or stay on this machine.
    pub fn is_secure(&self) -> bool {
        self.server.starts_with("https://") || self.server.contains("localhost")
    }
}

/// The reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// The HTTP client; holds the session cookie after login.
    client: Client,
    /// Authentication credentials.
    auth: Auth,
}

impl HttpTransport {
    /// Create a transport without logging in.
    pub fn new(auth: Auth) -> Result<Self> {
        let client = Self::build_http_client()?;
        Ok(Self::with_client(client, auth))
    }

    fn with_client(client: Client, auth: Auth) -> Self {
        Self { client, auth }
    }

    /// Create a transport and open an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the login
    /// request fails.
    #[instrument(skip(urls, auth, password), fields(server = %urls.server(), user = %auth.username()))]
    pub async fn connect(urls: &ServerUrls, auth: Auth, password: &str) -> Result<Self> {
        info!("Opening JIRA session");
        if !urls.is_secure() {
            debug!("Server does not use HTTPS, credentials are sent in clear text");
        }

        let transport = Self::new(auth)?.login(urls, password).await?;

        info!("JIRA session established");
        Ok(transport)
    }

    /// Post the session login; the client keeps the returned cookie.
    async fn login(self, urls: &ServerUrls, password: &str) -> Result<Self> {
        let mut params = Params::new();
        params.insert("username".to_string(), json!(self.auth.username()));
        params.insert("password".to_string(), json!(password));

        let response = self
            .send(Method::Post, &urls.session_url(), &params)
            .await?;
        debug!("auth response: {}", response);

        Ok(self)
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .cookie_store(true)
            .build()
            .map_err(ApiError::Network)
    }

    /// Handle the HTTP response, checking for errors and parsing JSON.
    async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();
        let url = response.url().to_string();

        if status.is_success() {
            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body)
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", error_body);

            Err(error_from_response(status, &url, &error_body))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, params))]
    async fn send(&self, method: Method, url: &str, params: &Params) -> Result<Value> {
        let request = match method {
            Method::Get => {
                debug!("GETting {} with params {:?}", url, params);
                self.client.get(url).query(&query_pairs(params))
            }
            Method::Post => {
                // Never log the login body.
                debug!("POSTing {} with {} params", url, params.len());
                self.client
                    .post(url)
                    .header(header::CONTENT_TYPE, "application/json")
                    .json(params)
            }
        };

        let response = request
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::handle_response(response).await
    }
}

/// Render params as query pairs; strings go through unquoted.
fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Create an appropriate error from an HTTP response.
fn error_from_response(status: StatusCode, url: &str, body: &str) -> ApiError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(arr) = json.get("errorMessages").and_then(|m| m.as_array()) {
            if !arr.is_empty() {
                return ApiError::from_status(
                    status,
                    &arr.iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
        }
        if let Some(obj) = json.get("errors").and_then(|e| e.as_object()) {
            let error_strings: Vec<String> =
                obj.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            if !error_strings.is_empty() {
                return ApiError::from_status(status, &error_strings.join(", "));
            }
        }
    }

    ApiError::from_status(status, url)
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
