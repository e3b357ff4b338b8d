//! Query-string filters for list endpoints.

use std::collections::BTreeMap;

use collectivite_core::types::ProjectStatus;

/// Key/value filters appended to list requests as a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    params: BTreeMap<String, String>,
}

impl Filters {
    /// Empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a filter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Restrict to a project status.
    #[must_use]
    pub fn status(self, status: ProjectStatus) -> Self {
        self.with("status", status.as_str())
    }

    /// Select a results page.
    #[must_use]
    pub fn page(self, page: u32) -> Self {
        self.with("page", page)
    }

    /// Cap the number of results.
    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        self.with("limit", limit)
    }

    /// Free-text search.
    #[must_use]
    pub fn search(self, term: impl Into<String>) -> Self {
        self.with("search", term.into())
    }

    /// Whether no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// `path` with the encoded query string appended.
    #[must_use]
    pub fn apply(&self, path: &str) -> String {
        if self.params.is_empty() {
            return path.to_string();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish();
        format!("{path}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_leave_path() {
        assert_eq!(Filters::new().apply("/projects"), "/projects");
    }

    #[test]
    fn test_filters_are_encoded() {
        let filters = Filters::new()
            .status(ProjectStatus::UnderReview)
            .search("marché central")
            .limit(20);
        assert_eq!(
            filters.apply("/projects"),
            "/projects?limit=20&search=march%C3%A9+central&status=under_review"
        );
    }
}
