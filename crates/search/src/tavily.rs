//! Tavily search provider.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{ApiKey, ProviderFailure, SearchError, SearchHit, SearchProvider, SourceLocator};
use provider_http::{body_failure, status_failure, transport_failure};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "tavily";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Default number of results requested per search.
pub const DEFAULT_MAX_RESULTS: u8 = 5;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`TavilySearch`].
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub max_results: u8,
    pub request_timeout: Duration,
}

impl TavilyConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            max_results: DEFAULT_MAX_RESULTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_results(mut self, max_results: u8) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u8,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    content: String,
    #[serde(default)]
    url: Option<String>,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        SearchHit {
            content: result.content,
            locator: result.url.and_then(SourceLocator::new),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// A [`SearchProvider`] backed by the Tavily API.
pub struct TavilySearch {
    config: TavilyConfig,
    http: reqwest::Client,
}

impl TavilySearch {
    /// Creates a search client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the HTTP client cannot be constructed.
    pub fn new(config: TavilyConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchError::new(PROVIDER, transport_failure(e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &TavilyConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/search")
    }

    async fn request(&self, query: &str) -> Result<Vec<SearchHit>, ProviderFailure> {
        let body = SearchRequest {
            api_key: self.config.api_key.expose(),
            query,
            max_results: self.config.max_results,
            search_depth: "basic",
        };

        let response = self
            .http
            .post(self.search_url())
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        if !response.status().is_success() {
            let failure = status_failure(response).await;
            debug!(provider = PROVIDER, error = %failure, "search rejected");
            return Err(failure);
        }

        let parsed: SearchResponse = response.json().await.map_err(body_failure)?;
        Ok(parsed.results.into_iter().map(SearchHit::from).collect())
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        debug!(
            provider = PROVIDER,
            max_results = self.config.max_results,
            "sending search request"
        );
        let hits = self
            .request(query)
            .await
            .map_err(|failure| SearchError::new(PROVIDER, failure))?;
        debug!(provider = PROVIDER, hits = hits.len(), "search results received");
        Ok(hits)
    }
}
