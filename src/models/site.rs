//! Source site types.

use serde::{Deserialize, Serialize};

/// How a page is retrieved before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Plain HTTP GET; the server returns complete HTML.
    Static,
    /// Headless browser render; content is produced by JavaScript.
    Rendered,
}

/// Supported source sites. Each selects a fetch strategy and an extraction rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteType {
    /// Encyclopedia of Korean Culture (static pages).
    #[default]
    Encyclopedia,
    /// Korea tourism portal (JavaScript-rendered pages).
    Portal,
}

impl SiteType {
    pub const ALL: [SiteType; 2] = [SiteType::Encyclopedia, SiteType::Portal];

    pub fn strategy(self) -> FetchStrategy {
        match self {
            Self::Encyclopedia => FetchStrategy::Static,
            Self::Portal => FetchStrategy::Rendered,
        }
    }

    /// Whether fetching this site needs the browser backend.
    pub fn needs_browser(self) -> bool {
        self.strategy() == FetchStrategy::Rendered
    }

    /// Host used when search results are restricted to this site.
    pub fn domain(self) -> &'static str {
        match self {
            Self::Encyclopedia => "encykorea.aks.ac.kr",
            Self::Portal => "korean.visitkorea.or.kr",
        }
    }

    /// Parse from string (for CLI/env var).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "encyclopedia" | "encykorea" | "static" => Some(Self::Encyclopedia),
            "portal" | "visitkorea" | "rendered" => Some(Self::Portal),
            _ => None,
        }
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encyclopedia => write!(f, "encyclopedia"),
            Self::Portal => write!(f, "portal"),
        }
    }
}

impl std::str::FromStr for SiteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or_else(|| {
            format!(
                "Invalid site type '{}'. Valid options: encyclopedia, portal",
                s
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_follows_site() {
        assert_eq!(SiteType::Encyclopedia.strategy(), FetchStrategy::Static);
        assert_eq!(SiteType::Portal.strategy(), FetchStrategy::Rendered);
        assert!(!SiteType::Encyclopedia.needs_browser());
        assert!(SiteType::Portal.needs_browser());
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(SiteType::from_str("encyKorea"), Some(SiteType::Encyclopedia));
        assert_eq!(SiteType::from_str("visit-korea"), Some(SiteType::Portal));
        assert_eq!(SiteType::from_str("wiki"), None);
        assert!("wiki".parse::<SiteType>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for site in SiteType::ALL {
            assert_eq!(site.to_string().parse::<SiteType>(), Ok(site));
        }
    }
}
