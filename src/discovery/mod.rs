//! Finding the source page for a heritage site.
//!
//! A discovery source turns a free-text query into the URL of the best
//! matching page, or `NotFound`. Failures never escape a source: they are
//! logged and reported as `NotFound`.

mod google;
mod query;

pub use google::{GoogleSearch, GoogleSearchConfig, DEFAULT_SEARCH_ENDPOINT};
pub use query::QueryBuilder;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors inside a discovery source. Mapped to `Discovery::NotFound` at the
/// trait boundary.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Result link is not a valid URL: {0}")]
    InvalidLink(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Outcome of a discovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(Url),
    NotFound,
}

impl Discovery {
    pub fn url(&self) -> Option<&Url> {
        match self {
            Discovery::Found(url) => Some(url),
            Discovery::NotFound => None,
        }
    }
}

/// A search backend that resolves a query to its top result.
#[async_trait]
pub trait ResultDiscovery: Send + Sync {
    /// Source name used in logs.
    fn name(&self) -> &str;

    async fn discover(&self, query: &str) -> Discovery;
}
