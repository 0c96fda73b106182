//! Configuration management using the prefer crate.
//!
//! Precedence, lowest first: built-in defaults, config file
//! (`heritage.{toml,yaml,yml,json}`), environment, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::Columns;
use crate::discovery::GoogleSearchConfig;
use crate::models::SiteType;
use crate::scrapers::BrowserEngineConfig;

/// Default input workbook.
pub const DEFAULT_INPUT: &str = "./modified_heritage_site_list.xlsx";

/// Default output workbook.
pub const DEFAULT_OUTPUT: &str = "./heritage_google_results.xlsx";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns: Columns,
    pub site: SiteType,
    /// Delay between records in milliseconds.
    pub request_delay_ms: u64,
    /// Static fetch and search request timeout.
    pub request_timeout: Duration,
    /// Ceiling for one rendered navigation including the idle wait.
    pub navigation_timeout: Duration,
    /// None, "impersonate", or a literal user agent.
    pub user_agent: Option<String>,
    pub restrict_search_to_site: bool,
    pub search: GoogleSearchConfig,
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            columns: Columns::default(),
            site: SiteType::default(),
            request_delay_ms: 3000,
            request_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            user_agent: Some("impersonate".to_string()),
            restrict_search_to_site: false,
            search: GoogleSearchConfig::default(),
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl Settings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input dataset (.xlsx or .json).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Output dataset (.xlsx or .json).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteType>,
    /// Delay between records in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Navigation timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_search_to_site: Option<bool>,
    #[serde(default)]
    pub search: GoogleSearchConfig,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no config file is found.
    pub async fn load() -> Self {
        match prefer::load("heritage").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => {
                debug!("No heritage config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths in this config are resolved against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are joined onto `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref input) = self.input {
            settings.input = self.resolve_path(input, base_dir);
        }
        if let Some(ref output) = self.output {
            settings.output = self.resolve_path(output, base_dir);
        }
        if let Some(ref column) = self.name_column {
            settings.columns.name = column.clone();
        }
        if let Some(ref column) = self.location_column {
            settings.columns.location = column.clone();
        }
        if let Some(site) = self.site {
            settings.site = site;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(timeout) = self.navigation_timeout {
            settings.navigation_timeout = Duration::from_secs(timeout);
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(restrict) = self.restrict_search_to_site {
            settings.restrict_search_to_site = restrict;
        }
        settings.search = self.search.clone();
        settings.browser = self.browser.clone();
    }

    /// Build settings from this config, then apply environment overrides.
    pub fn into_settings(self) -> Settings {
        let base_dir = self
            .base_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut settings = Settings::default();
        self.apply_to_settings(&mut settings, &base_dir);
        settings.search = settings.search.with_env_overrides();
        settings.browser = settings.browser.with_env_overrides();
        settings
    }
}

/// Load settings from `explicit` if given, otherwise from the discovered
/// config file (if any).
pub async fn load_settings(explicit: Option<&Path>) -> Result<Settings, String> {
    let config = match explicit {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };
    if let Some(ref path) = config.source_path {
        debug!("Loaded config from {}", path.display());
    }
    Ok(config.into_settings())
}
