//! Web search collaborator
//!
//! `SearchProvider` is the seam the orchestrator searches through;
//! `TavilySearch` implements it against the Tavily Search API.
//!
//! # Production Features
//!
//! - HTTP timeout and retry with exponential backoff
//! - Typed error handling for rate limits and timeouts
//! - API key checked at the first search, not at construction

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::state::SourceRecord;

/// Default Tavily endpoint
pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Default timeout for Tavily API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Typed errors for the search collaborator
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Tavily API key not found. Please set the TAVILY_API_KEY environment variable.")]
    MissingApiKey,

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl SearchError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::Connection(_)
                | SearchError::RateLimited
                | SearchError::ServerError(_, _)
        )
    }
}

/// Search collaborator: `(query, max_results)` to ordered hits
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SourceRecord>, SearchError>;
}

/// Request body for Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
    include_images: bool,
    include_raw_content: bool,
}

/// Response from Tavily API
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// Individual search result
#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SourceRecord {
    fn from(r: TavilyResult) -> Self {
        SourceRecord::new(r.title, r.url, r.content)
    }
}

/// Tavily-backed search provider
///
/// # Example
/// ```ignore
/// let search = TavilySearch::new(std::env::var("TAVILY_API_KEY").ok());
/// let hits = search.search("fintech CTOs", 5).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TavilySearch {
    api_key: Option<String>,
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl TavilySearch {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: TAVILY_BASE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    /// Point the client at another endpoint (e.g. a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set custom max retries and base backoff delay
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    /// Execute HTTP request with retry and backoff
    async fn execute_with_retry(
        &self,
        api_key: &str,
        request: &TavilyRequest<'_>,
    ) -> Result<TavilyResponse, SearchError> {
        let mut attempt = 0;
        loop {
            match self.execute_single_request(api_key, request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.pow(attempt);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis(), "Tavily request failed, will retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute a single HTTP request
    async fn execute_single_request(
        &self,
        api_key: &str,
        request: &TavilyRequest<'_>,
    ) -> Result<TavilyResponse, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else if e.is_connect() {
                    SearchError::Connection(e.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| SearchError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(SearchError::Unauthorized),
            429 => Err(SearchError::RateLimited),
            400 => Err(SearchError::BadRequest(error_text)),
            500..=599 => Err(SearchError::ServerError(status.as_u16(), error_text)),
            code => Err(SearchError::HttpError(code, error_text)),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SourceRecord>, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::MissingApiKey)?;

        info!(query = %query, max_results, "Performing web search");

        let request = TavilyRequest {
            query,
            max_results,
            search_depth: "advanced",
            include_answer: false,
            include_images: false,
            include_raw_content: false,
        };

        let response = self.execute_with_retry(api_key, &request).await?;
        let results: Vec<SourceRecord> =
            response.results.into_iter().map(SourceRecord::from).collect();

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            debug!(query = %query, count = results.len(), "Search completed");
        }

        Ok(results)
    }
}


/// HTTP Integration tests with mocked server
#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(server: &MockServer) -> TavilySearch {
        TavilySearch::new(Some("test-api-key".to_string()))
            .with_base_url(server.uri())
            .with_timeout(Duration::from_secs(5))
            .with_retries(0, Duration::from_millis(10))
    }

    fn sample_success_response() -> serde_json::Value {
        serde_json::json!({
            "answer": null,
            "results": [
                {
                    "title": "Jane Doe - CTO",
                    "url": "https://example.com/jane",
                    "content": "Jane Doe https://www.linkedin.com/in/jane-doe leads engineering.",
                    "score": 0.95
                },
                {
                    "title": "Fintech leaders",
                    "url": "https://example.com/leaders",
                    "content": "A list of leaders.",
                    "score": 0.88
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_http_successful_search() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(body_partial_json(serde_json::json!({
                "query": "fintech CTOs",
                "max_results": 5,
                "search_depth": "advanced"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_success_response()))
            .mount(&mock_server)
            .await;

        let results = tool(&mock_server).search("fintech CTOs", 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Jane Doe - CTO");
        assert_eq!(results[1].url, "https://example.com/leaders");
    }

    #[tokio::test]
    async fn test_http_unauthorized_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&mock_server)
            .await;

        let result = tool(&mock_server).search("test", 5).await;

        assert!(matches!(result, Err(SearchError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_http_non_success_status_surfaces() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&mock_server)
            .await;

        let result = tool(&mock_server).search("test", 5).await;

        assert!(matches!(result, Err(SearchError::HttpError(403, _))));
    }

    #[tokio::test]
    async fn test_http_retry_on_server_error() {
        let mock_server = MockServer::start().await;

        // First two calls fail with 500, third succeeds
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_success_response()))
            .mount(&mock_server)
            .await;

        let search = tool(&mock_server).with_retries(3, Duration::from_millis(10));
        let result = search.search("test", 5).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_http_no_retry_on_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let search = tool(&mock_server).with_retries(3, Duration::from_millis(10));
        let result = search.search("test", 5).await;

        assert!(matches!(result, Err(SearchError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_http_malformed_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&mock_server)
            .await;

        let result = tool(&mock_server).search("test", 5).await;

        assert!(matches!(result, Err(SearchError::ParseError(_))));
    }
}
