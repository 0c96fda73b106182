//! Search query builder.

/// Builder for constructing search queries.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    /// Target domain for site: restriction.
    site: Option<String>,
    /// Search terms.
    terms: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict search to a specific domain.
    pub fn site(mut self, domain: &str) -> Self {
        self.site = Some(domain.to_string());
        self
    }

    /// Add a search term. Blank terms are skipped.
    pub fn term(mut self, term: &str) -> Self {
        let term = term.trim();
        if !term.is_empty() {
            self.terms.push(term.to_string());
        }
        self
    }

    /// Build the final query string.
    pub fn build(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref site) = self.site {
            parts.push(format!("site:{}", site));
        }

        parts.extend(self.terms.iter().cloned());
        parts.join(" ")
    }

    /// True when no search terms were added. A site restriction alone is
    /// not a query.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_then_name() {
        let query = QueryBuilder::new().term("Gyeongju-si").term("Bulguksa").build();
        assert_eq!(query, "Gyeongju-si Bulguksa");
    }

    #[test]
    fn blank_terms_are_dropped() {
        let builder = QueryBuilder::new().term("  ").term(" Bulguksa ");
        assert_eq!(builder.build(), "Bulguksa");

        let empty = QueryBuilder::new().site("encykorea.aks.ac.kr").term("");
        assert!(empty.is_empty());
    }

    #[test]
    fn site_restriction_comes_first() {
        let query = QueryBuilder::new()
            .site("encykorea.aks.ac.kr")
            .term("Gyeongju-si")
            .term("Bulguksa")
            .build();
        assert_eq!(query, "site:encykorea.aks.ac.kr Gyeongju-si Bulguksa");
    }
}
