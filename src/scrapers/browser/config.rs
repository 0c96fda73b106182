//! Browser engine configuration types.
//!
//! These types are always compiled (regardless of the `browser` feature) so
//! that config parsing works in builds without browser support.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::IdlePolicy;

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chrome executable. Searched in common locations and PATH when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    /// Can also be set via BROWSER_URL environment variable.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// In-flight request count at or below which the network counts as idle.
    #[serde(default = "default_idle_connections")]
    pub idle_connections: usize,

    /// How long the network must stay idle before the page counts as loaded.
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
}

fn default_headless() -> bool {
    true
}

fn default_idle_connections() -> usize {
    2
}

fn default_idle_ms() -> u64 {
    500
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            idle_connections: default_idle_connections(),
            idle_ms: default_idle_ms(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.is_empty() {
                self.remote_url = Some(val);
            }
        }
        self
    }

    /// Network-idle policy derived from this config.
    pub fn idle_policy(&self) -> IdlePolicy {
        IdlePolicy {
            max_inflight: self.idle_connections,
            quiet_period: Duration::from_millis(self.idle_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_network_idle_two() {
        let config = BrowserEngineConfig::default();
        assert!(config.headless);
        assert_eq!(config.idle_policy(), IdlePolicy::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: BrowserEngineConfig = toml::from_str(r#"remote_url = "ws://localhost:9222""#).unwrap();
        assert_eq!(config.remote_url.as_deref(), Some("ws://localhost:9222"));
        assert!(config.headless);
        assert_eq!(config.idle_connections, 2);
        assert_eq!(config.idle_ms, 500);
    }
}
