//! Encyclopedia of Korean Culture article pages.

use super::{Rule, RuleSet};

pub(super) static RULES: RuleSet = RuleSet {
    summary: &[Rule::Region("#cm_def .text-detail")],
    content: &[
        Rule::Section("내용"),
        Rule::Section("변천"),
        Rule::Region("#cm_smry .text-detail"),
        Rule::Section("형태"),
    ],
};

#[cfg(test)]
mod tests {
    use crate::extract::extract;
    use crate::models::{SiteType, NO_CONTENT};

    fn section(title: &str, body: &str) -> String {
        format!(
            r#"<div class="detail-section">
                 <div class="section-head"><span class="section-title">{title}</span></div>
                 <div class="section-body">{body}</div>
               </div>"#
        )
    }

    fn page(parts: &[String]) -> String {
        format!(
            r#"<html><body>
                 <div id="cm_def"><div class="text-detail">경상북도 경주시에 있는 신라시대의 사찰.</div></div>
                 {}
               </body></html>"#,
            parts.join("\n")
        )
    }

    #[test]
    fn content_section_wins() {
        let html = page(&[
            section("변천", "Rebuilt."),
            section("내용", "Founded in\n   774 CE."),
        ]);
        let result = extract(&html, SiteType::Encyclopedia);
        assert_eq!(result.summary, "경상북도 경주시에 있는 신라시대의 사찰.");
        assert_eq!(result.content, "Founded in 774 CE.");
    }

    #[test]
    fn history_section_is_second_choice() {
        let html = page(&[section("형태", "Two pagodas."), section("변천", "Rebuilt in 1969.")]);
        let result = extract(&html, SiteType::Encyclopedia);
        assert_eq!(result.content, "Rebuilt in 1969.");
    }

    #[test]
    fn short_definition_precedes_form_section() {
        let mut html = page(&[section("형태", "Two pagodas.")]);
        html = html.replace(
            "</body>",
            r#"<div id="cm_smry"><p class="text-detail">  Head temple of the Jogye Order.  </p></div></body>"#,
        );
        let result = extract(&html, SiteType::Encyclopedia);
        assert_eq!(result.content, "Head temple of the Jogye Order.");
    }

    #[test]
    fn form_section_is_last_resort() {
        let html = page(&[section("형태", "Two   pagodas.")]);
        let result = extract(&html, SiteType::Encyclopedia);
        assert_eq!(result.content, "Two pagodas.");
    }

    #[test]
    fn nothing_matching_yields_sentinel_content() {
        let html = page(&[section("참고문헌", "Bibliography")]);
        let result = extract(&html, SiteType::Encyclopedia);
        assert_ne!(result.summary, NO_CONTENT);
        assert_eq!(result.content, NO_CONTENT);
    }

    #[test]
    fn missing_definition_yields_sentinel_summary() {
        let html = format!("<html><body>{}</body></html>", section("내용", "Body"));
        let result = extract(&html, SiteType::Encyclopedia);
        assert_eq!(result.summary, NO_CONTENT);
        assert_eq!(result.content, "Body");
    }
}
