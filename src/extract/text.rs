//! Text lookups shared by the rule sets.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const SECTION_TITLE: &str = ".section-title";
const SECTION_BODY: &str = ".section-body";
const DETAIL_SECTION_CLASS: &str = "detail-section";

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("Skipping invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Replace every run of whitespace (including newlines) with one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text of all elements matching `css`, trimmed.
pub fn region_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    let text: String = document.select(&sel).flat_map(|el| el.text()).collect();
    non_empty(text.trim().to_string())
}

/// Body text of the detail section(s) titled `title`.
///
/// Every `.section-title` containing `title` is resolved to its nearest
/// `.detail-section`; the text of each `.section-body` inside those sections
/// is joined and whitespace-collapsed. Returns `None` when no title matches
/// or the body is empty.
pub fn section_text(document: &Html, title: &str) -> Option<String> {
    let title_sel = selector(SECTION_TITLE)?;
    let body_sel = selector(SECTION_BODY)?;

    let mut sections: Vec<ElementRef<'_>> = Vec::new();
    for heading in document.select(&title_sel) {
        let heading_text: String = heading.text().collect();
        if !heading_text.contains(title) {
            continue;
        }
        if let Some(section) = closest_with_class(heading, DETAIL_SECTION_CLASS) {
            if !sections.iter().any(|s| s.id() == section.id()) {
                sections.push(section);
            }
        }
    }

    if sections.is_empty() {
        return None;
    }

    let mut bodies: Vec<ElementRef<'_>> = Vec::new();
    for body in sections.iter().flat_map(|s| s.select(&body_sel)) {
        if !bodies.iter().any(|b| b.id() == body.id()) {
            bodies.push(body);
        }
    }

    let raw: String = bodies.iter().flat_map(|b| b.text()).collect();
    non_empty(collapse_whitespace(&raw))
}

/// The element itself or its nearest ancestor carrying `class`.
fn closest_with_class<'a>(element: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| el.value().classes().any(|c| c == class))
}
