//! Site-specific content extraction.
//!
//! Each [`SiteType`] maps to a static [`RuleSet`]: an ordered list of rules
//! for the summary and another for the content. The first rule yielding
//! non-empty text wins; if none does, the field falls back to
//! [`NO_CONTENT`](crate::models::NO_CONTENT). Extraction never touches the
//! network, so the same `(html, site)` pair always yields the same result.

mod encyclopedia;
mod portal;
mod text;

pub use text::{collapse_whitespace, region_text, section_text};

use scraper::Html;

use crate::models::{ExtractionResult, SiteType};

/// A single lookup against a parsed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Body text of the detail section whose title contains this string.
    Section(&'static str),
    /// Trimmed text of every element matching this CSS selector.
    Region(&'static str),
}

impl Rule {
    fn apply(&self, document: &Html) -> Option<String> {
        match self {
            Rule::Section(title) => section_text(document, title),
            Rule::Region(css) => region_text(document, css),
        }
    }
}

/// Ordered rules for both output fields of one site type.
#[derive(Debug)]
pub struct RuleSet {
    pub summary: &'static [Rule],
    pub content: &'static [Rule],
}

impl RuleSet {
    /// Run the rules against raw HTML.
    pub fn apply(&self, html: &str) -> ExtractionResult {
        let document = Html::parse_document(html);
        ExtractionResult::new(
            first_match(&document, self.summary),
            first_match(&document, self.content),
        )
    }
}

fn first_match(document: &Html, rules: &[Rule]) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(document))
}

/// Rule set for a site type.
pub fn rules_for(site: SiteType) -> &'static RuleSet {
    match site {
        SiteType::Encyclopedia => &encyclopedia::RULES,
        SiteType::Portal => &portal::RULES,
    }
}

/// Extract summary and content from a page of the given site type.
pub fn extract(html: &str, site: SiteType) -> ExtractionResult {
    rules_for(site).apply(html)
}
