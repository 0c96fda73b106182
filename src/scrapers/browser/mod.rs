//! Headless-browser backend for pages that build their content with script.
//!
//! Uses chromiumoxide (CDP). One browser serves a whole run; each render
//! opens and closes its own tab.

mod config;
#[cfg(feature = "browser")]
mod fetch;
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
mod idle;
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
mod tab;

pub use config::BrowserEngineConfig;
pub use idle::{IdlePolicy, InFlight};

use std::time::Duration;

use async_trait::async_trait;

use super::{BackendLauncher, RenderBackend};

#[cfg(feature = "browser")]
use anyhow::{Context, Result};
#[cfg(feature = "browser")]
use chromiumoxide::handler::Handler;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::info;

/// How long shutdown waits for the CDP handler task before aborting it.
#[cfg(feature = "browser")]
const HANDLER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A launched (or connected) Chrome instance.
#[cfg(feature = "browser")]
pub struct BrowserBackend {
    pub(crate) browser: Mutex<Browser>,
    pub(crate) handler: JoinHandle<()>,
    pub(crate) remote: bool,
    pub(crate) user_agent: String,
    pub(crate) navigation_timeout: Duration,
    pub(crate) idle: IdlePolicy,
}

#[cfg(feature = "browser")]
impl BrowserBackend {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Launch a local browser, or connect to `remote_url` when configured.
    pub async fn start(
        config: &BrowserEngineConfig,
        user_agent: String,
        navigation_timeout: Duration,
    ) -> Result<Self> {
        let remote = config.remote_url.is_some();
        let (browser, handler) = match config.remote_url.as_deref() {
            Some(url) => Self::connect_remote(url, navigation_timeout).await?,
            None => Self::launch_local(config).await?,
        };

        Ok(Self {
            browser: Mutex::new(browser),
            handler: spawn_handler(handler),
            remote,
            user_agent,
            navigation_timeout,
            idle: config.idle_policy(),
        })
    }

    /// Find Chrome executable.
    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set browser.chrome_path / BROWSER_URL"
        ))
    }

    async fn launch_local(config: &BrowserEngineConfig) -> Result<(Browser, Handler)> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = match &config.chrome_path {
            Some(path) => path.clone(),
            None => Self::find_chrome()?,
        };

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(url: &str, request_timeout: Duration) -> Result<(Browser, Handler)> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout,
            ..Default::default()
        };

        Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")
    }
}

#[cfg(feature = "browser")]
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// Starts Chrome on demand for runs over rendered sites.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserEngineConfig,
    user_agent: String,
    navigation_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: BrowserEngineConfig, user_agent: String, navigation_timeout: Duration) -> Self {
        Self {
            config,
            user_agent,
            navigation_timeout,
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BackendLauncher for ChromeLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn RenderBackend>> {
        let backend =
            BrowserBackend::start(&self.config, self.user_agent.clone(), self.navigation_timeout)
                .await?;
        Ok(Box::new(backend))
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[async_trait]
impl BackendLauncher for ChromeLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn RenderBackend>> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }
}
