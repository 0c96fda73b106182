//! Google Custom Search JSON API source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{Discovery, DiscoveryError, ResultDiscovery};

/// Custom Search JSON API endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Search credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleSearchConfig {
    /// Programmable search engine id.
    #[serde(default)]
    pub cx: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    DEFAULT_SEARCH_ENDPOINT.to_string()
}

impl Default for GoogleSearchConfig {
    fn default() -> Self {
        Self {
            cx: String::new(),
            api_key: String::new(),
            endpoint: default_endpoint(),
        }
    }
}

impl GoogleSearchConfig {
    /// Apply environment variable overrides.
    ///
    /// - `CX` - search engine id
    /// - `API_KEY` - API key
    /// - `SEARCH_ENDPOINT` - alternate endpoint
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CX") {
            if !val.is_empty() {
                self.cx = val;
            }
        }
        if let Ok(val) = std::env::var("API_KEY") {
            if !val.is_empty() {
                self.api_key = val;
            }
        }
        if let Ok(val) = std::env::var("SEARCH_ENDPOINT") {
            if !val.is_empty() {
                self.endpoint = val;
            }
        }
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.cx.is_empty() && !self.api_key.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Discovery via the Custom Search JSON API, one result per query.
pub struct GoogleSearch {
    config: GoogleSearchConfig,
    client: reqwest::Client,
}

impl GoogleSearch {
    pub fn new(config: GoogleSearchConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Issue the search and return the first link, if any.
    pub async fn search(&self, query: &str) -> Result<Option<Url>, DiscoveryError> {
        if !self.config.is_configured() {
            return Err(DiscoveryError::Config(
                "search credentials missing (set CX and API_KEY)".to_string(),
            ));
        }

        debug!("Google search: {}", query);

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("cx", self.config.cx.as_str()),
                ("q", query),
                ("num", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(DiscoveryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| DiscoveryError::Parse(e.to_string()))?;

        match parsed.items.into_iter().next() {
            Some(item) => Url::parse(&item.link)
                .map(Some)
                .map_err(|_| DiscoveryError::InvalidLink(item.link)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ResultDiscovery for GoogleSearch {
    fn name(&self) -> &str {
        "google"
    }

    async fn discover(&self, query: &str) -> Discovery {
        let query = query.trim();
        if query.is_empty() {
            return Discovery::NotFound;
        }

        match self.search(query).await {
            Ok(Some(url)) => {
                debug!("Found {} for '{}'", url, query);
                Discovery::Found(url)
            }
            Ok(None) => {
                debug!("No search results for '{}'", query);
                Discovery::NotFound
            }
            Err(e) => {
                warn!("Error during Google search for '{}': {}", query, e);
                Discovery::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/customsearch/v1", addr)
    }

    fn source(endpoint: String) -> GoogleSearch {
        let config = GoogleSearchConfig {
            cx: "test-cx".to_string(),
            api_key: "test-key".to_string(),
            endpoint,
        };
        GoogleSearch::new(config, reqwest::Client::new())
    }

    async fn echo_link(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        assert_eq!(params.get("num").map(String::as_str), Some("1"));
        assert_eq!(params.get("cx").map(String::as_str), Some("test-cx"));
        assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
        let body = serde_json::json!({
            "items": [
                {"link": "https://encykorea.aks.ac.kr/Article/E0024066", "title": params["q"]},
                {"link": "https://example.com/second"}
            ]
        });
        axum::Json(body)
    }

    #[tokio::test]
    async fn returns_first_link() {
        let app = Router::new().route("/customsearch/v1", get(echo_link));
        let search = source(serve(app).await);

        let result = search.discover("Gyeongju-si Bulguksa").await;
        assert_eq!(
            result.url().map(Url::as_str),
            Some("https://encykorea.aks.ac.kr/Article/E0024066")
        );
    }

    #[tokio::test]
    async fn zero_items_is_not_found() {
        let app = Router::new().route(
            "/customsearch/v1",
            get(|| async { axum::Json(serde_json::json!({"kind": "customsearch#search"})) }),
        );
        let search = source(serve(app).await);
        assert_eq!(search.discover("nothing here").await, Discovery::NotFound);
    }

    #[tokio::test]
    async fn quota_error_is_not_found() {
        let app = Router::new().route(
            "/customsearch/v1",
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    axum::Json(serde_json::json!({"error": {"code": 429, "message": "Quota exceeded"}})),
                )
            }),
        );
        let search = source(serve(app).await);

        let err = search.search("Bulguksa").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Api { status: 429, ref message } if message == "Quota exceeded"));
        assert_eq!(search.discover("Bulguksa").await, Discovery::NotFound);
    }

    #[tokio::test]
    async fn malformed_body_is_not_found() {
        let app = Router::new().route("/customsearch/v1", get(|| async { "not json" }));
        let search = source(serve(app).await);

        assert!(matches!(
            search.search("Bulguksa").await,
            Err(DiscoveryError::Parse(_))
        ));
        assert_eq!(search.discover("Bulguksa").await, Discovery::NotFound);
    }

    #[tokio::test]
    async fn invalid_link_is_not_found() {
        let app = Router::new().route(
            "/customsearch/v1",
            get(|| async { axum::Json(serde_json::json!({"items": [{"link": "not a url"}]})) }),
        );
        let search = source(serve(app).await);
        assert_eq!(search.discover("Bulguksa").await, Discovery::NotFound);
    }

    #[tokio::test]
    async fn blank_query_skips_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/customsearch/v1",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    axum::Json(serde_json::json!({}))
                }),
            )
            .with_state(hits.clone());
        let search = source(serve(app).await);

        assert_eq!(search.discover("   ").await, Discovery::NotFound);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credentials_is_not_found() {
        let search = GoogleSearch::new(GoogleSearchConfig::default(), reqwest::Client::new());
        assert!(matches!(
            search.search("Bulguksa").await,
            Err(DiscoveryError::Config(_))
        ));
        assert_eq!(search.discover("Bulguksa").await, Discovery::NotFound);
    }
}
