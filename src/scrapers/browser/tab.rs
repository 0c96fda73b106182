//! Tab ownership for a single render.

use std::future::Future;

use async_trait::async_trait;
use tracing::warn;
use url::Url;

/// A closable browser tab handle. Clones refer to the same tab.
#[async_trait]
pub trait Tab: Clone + Send + Sync + 'static {
    async fn close_tab(self) -> Result<(), String>;
}

/// Owns one tab for the duration of a render.
///
/// `run` closes the tab once the work finishes, whatever its outcome.
/// Dropping an unclosed guard (cancellation, panic) schedules the close on
/// the runtime instead.
pub struct TabGuard<T: Tab> {
    tab: T,
    url: String,
    closed: bool,
}

impl<T: Tab> TabGuard<T> {
    pub fn new(tab: T, url: &Url) -> Self {
        Self {
            tab,
            url: url.to_string(),
            closed: false,
        }
    }

    pub async fn run<F, Fut, R>(self, work: F) -> R
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let out = work(self.tab.clone()).await;
        self.close().await;
        out
    }

    pub async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.tab.clone().close_tab().await {
            warn!("Failed to close tab for {}: {}", self.url, e);
        }
    }
}

impl<T: Tab> Drop for TabGuard<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let tab = self.tab.clone();
        let url = std::mem::take(&mut self.url);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = tab.close_tab().await {
                    warn!("Failed to close abandoned tab for {}: {}", url, e);
                }
            });
        }
    }
}
