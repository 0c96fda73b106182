//! Record types flowing through the enrichment pipeline.

mod site;

pub use site::{FetchStrategy, SiteType};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder written whenever an expected region is absent.
pub const NO_CONTENT: &str = "No content found.";

/// One heritage site loaded from the input dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// Site name (e.g. `POI_NM`).
    pub name: String,
    /// Administrative location (e.g. `SIGNGU_NM`).
    pub location: String,
    /// Every column of the source row, keyed by header.
    pub fields: BTreeMap<String, String>,
}

impl InputRecord {
    /// Create a record with only the name and location populated.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Attach the full source row.
    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = fields;
        self
    }
}

/// Summary and body text pulled from a source page.
///
/// Both fields always hold either real text or [`NO_CONTENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub summary: String,
    pub content: String,
}

impl ExtractionResult {
    /// Build a result, substituting the sentinel for missing or blank text.
    pub fn new(summary: Option<String>, content: Option<String>) -> Self {
        Self {
            summary: or_sentinel(summary),
            content: or_sentinel(content),
        }
    }

    /// True when neither field carries extracted text.
    pub fn is_empty(&self) -> bool {
        self.summary == NO_CONTENT && self.content == NO_CONTENT
    }
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn or_sentinel(text: Option<String>) -> String {
    match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => NO_CONTENT.to_string(),
    }
}

/// One row of the output dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "Content")]
    pub content: String,
}

impl OutputRecord {
    /// Column headers in output order.
    pub const HEADERS: [&'static str; 4] = ["Name", "Location", "Summary", "Content"];

    /// Merge an input record with whatever was extracted for it.
    pub fn from_parts(record: &InputRecord, extracted: ExtractionResult) -> Self {
        Self {
            name: record.name.clone(),
            location: record.location.clone(),
            summary: extracted.summary,
            content: extracted.content,
        }
    }

    /// Cell values in [`Self::HEADERS`] order.
    pub fn cells(&self) -> [&str; 4] {
        [&self.name, &self.location, &self.summary, &self.content]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_result_is_all_sentinel() {
        let result = ExtractionResult::default();
        assert_eq!(result.summary, NO_CONTENT);
        assert_eq!(result.content, NO_CONTENT);
        assert!(result.is_empty());
    }

    #[test]
    fn blank_text_becomes_sentinel() {
        let result = ExtractionResult::new(Some("  \n ".to_string()), Some("body".to_string()));
        assert_eq!(result.summary, NO_CONTENT);
        assert_eq!(result.content, "body");
        assert!(!result.is_empty());
    }

    #[test]
    fn output_record_keeps_input_identity() {
        let input = InputRecord::new("Bulguksa", "Gyeongju-si");
        let out = OutputRecord::from_parts(&input, ExtractionResult::default());
        assert_eq!(out.cells(), ["Bulguksa", "Gyeongju-si", NO_CONTENT, NO_CONTENT]);
    }

    #[test]
    fn output_record_serializes_with_column_names() {
        let input = InputRecord::new("Bulguksa", "Gyeongju-si");
        let out = OutputRecord::from_parts(&input, ExtractionResult::default());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["Name"], "Bulguksa");
        assert_eq!(json["Location"], "Gyeongju-si");
        assert_eq!(json["Summary"], NO_CONTENT);
    }
}
