//! Page fetching: static HTTP and headless-browser strategies.

pub mod browser;
mod http_client;

pub use browser::{BrowserEngineConfig, ChromeLauncher, IdlePolicy};
pub use http_client::{resolve_user_agent, HttpClient, DEFAULT_USER_AGENT, IMPERSONATE_USER_AGENTS};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::extract;
use crate::models::{ExtractionResult, FetchStrategy, SiteType};

/// Errors from retrieving a page. Never fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation timed out after {secs}s for {url}")]
    Timeout { url: String, secs: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browser backend not available for rendered pages")]
    BackendUnavailable,
}

/// Something that can return the HTML for a URL with a plain request.
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn get_html(&self, url: &Url) -> Result<String, FetchError>;
}

/// A running render-capable backend (one browser, many short-lived tabs).
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Render `url` in a fresh tab and return the final HTML. The tab is
    /// closed before this returns, on success and on error.
    async fn render(&self, url: &Url) -> Result<String, FetchError>;

    /// Tear the backend down. Called exactly once by the owner.
    async fn shutdown(self: Box<Self>);
}

/// Starts a render backend.
#[async_trait]
pub trait BackendLauncher: Send + Sync {
    async fn launch(&self) -> anyhow::Result<Box<dyn RenderBackend>>;
}

/// Dispatches a fetch to the strategy of the requested site type and
/// extracts the result.
///
/// The fetcher only borrows the render backend; its lifetime belongs to
/// whoever acquired it.
pub struct PageFetcher<'a> {
    http: &'a dyn HtmlSource,
    renderer: Option<&'a dyn RenderBackend>,
}

impl<'a> PageFetcher<'a> {
    pub fn new(http: &'a dyn HtmlSource, renderer: Option<&'a dyn RenderBackend>) -> Self {
        Self { http, renderer }
    }

    /// Fetch `url` and apply the rule set for `site`.
    pub async fn fetch(&self, url: &Url, site: SiteType) -> Result<ExtractionResult, FetchError> {
        match self.fetch_html(url, site).await {
            Ok(html) => {
                debug!("Fetched {} bytes from {}", html.len(), url);
                Ok(extract::extract(&html, site))
            }
            Err(e) => {
                warn!("Error fetching page {}: {}", url, e);
                Err(e)
            }
        }
    }

    async fn fetch_html(&self, url: &Url, site: SiteType) -> Result<String, FetchError> {
        match site.strategy() {
            FetchStrategy::Static => self.http.get_html(url).await,
            FetchStrategy::Rendered => {
                let renderer = self.renderer.ok_or(FetchError::BackendUnavailable)?;
                renderer.render(url).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_CONTENT;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedHtml(&'static str);

    #[async_trait]
    impl HtmlSource for FixedHtml {
        async fn get_html(&self, _url: &Url) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RenderBackend for CountingRenderer {
        async fn render(&self, url: &Url) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Timeout {
                url: url.to_string(),
                secs: 30,
            })
        }

        async fn shutdown(self: Box<Self>) {}
    }

    fn url() -> Url {
        Url::parse("https://encykorea.aks.ac.kr/Article/E0024066").unwrap()
    }

    #[tokio::test]
    async fn static_site_uses_http_source() {
        let http = FixedHtml(r#"<div id="cm_def"><span class="text-detail">Temple</span></div>"#);
        let renderer = CountingRenderer::default();
        let fetcher = PageFetcher::new(&http, Some(&renderer));

        let result = fetcher.fetch(&url(), SiteType::Encyclopedia).await.unwrap();
        assert_eq!(result.summary, "Temple");
        assert_eq!(result.content, NO_CONTENT);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rendered_site_uses_backend() {
        let http = FixedHtml("");
        let renderer = CountingRenderer::default();
        let fetcher = PageFetcher::new(&http, Some(&renderer));

        let err = fetcher.fetch(&url(), SiteType::Portal).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rendered_site_without_backend_is_an_error() {
        let http = FixedHtml("");
        let fetcher = PageFetcher::new(&http, None);

        let err = fetcher.fetch(&url(), SiteType::Portal).await.unwrap_err();
        assert!(matches!(err, FetchError::BackendUnavailable));
    }

    #[test]
    fn error_display_carries_message() {
        let err = FetchError::Navigation {
            url: "https://example.com".to_string(),
            message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Navigation failed for https://example.com: net::ERR_NAME_NOT_RESOLVED"
        );
    }
}
