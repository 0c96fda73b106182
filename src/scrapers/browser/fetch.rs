//! Rendering a single URL in its own tab.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use tracing::{debug, warn};
use url::Url;

use super::idle;
use super::tab::{Tab, TabGuard};
use super::{BrowserBackend, HANDLER_SHUTDOWN_GRACE};
use crate::scrapers::{FetchError, RenderBackend};

#[async_trait]
impl Tab for Page {
    async fn close_tab(self) -> Result<(), String> {
        self.close().await.map_err(|e| e.to_string())
    }
}

fn browser_error(e: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Browser(e.to_string())
}

impl BrowserBackend {
    async fn render_in(&self, page: &Page, url: &Url) -> Result<String, FetchError> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(browser_error)?;

        let mut idle = idle::attach(page, self.idle)
            .await
            .map_err(browser_error)?;

        idle.load(url, self.navigation_timeout, async {
            page.goto(url.as_str())
                .await
                .map(|_| ())
                .map_err(|e| FetchError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
        })
        .await?;

        page.content().await.map_err(browser_error)
    }
}

#[async_trait]
impl RenderBackend for BrowserBackend {
    async fn render(&self, url: &Url) -> Result<String, FetchError> {
        debug!("Rendering {}", url);

        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| FetchError::Browser(format!("Failed to open tab: {}", e)))?
        };

        TabGuard::new(page, url)
            .run(|page| async move { self.render_in(&page, url).await })
            .await
    }

    async fn shutdown(self: Box<Self>) {
        let BrowserBackend {
            browser,
            mut handler,
            remote,
            ..
        } = *self;

        // A shared remote browser outlives the run; only our connection goes.
        if !remote {
            let mut browser = browser.into_inner();
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser process wait failed: {}", e);
            }
        } else {
            drop(browser);
        }

        if tokio::time::timeout(HANDLER_SHUTDOWN_GRACE, &mut handler)
            .await
            .is_err()
        {
            handler.abort();
        }
        debug!("Browser backend shut down");
    }
}
