//! Search request construction for the `/search` endpoint.

use explor_types::DepartmentId;

/// Query text sent when the caller's query is blank.
///
/// The API rejects an empty `q`, so blank input searches for everything
/// tagged "art" instead.
pub const DEFAULT_QUERY: &str = "art";

/// Parameters of one `/search` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text query; blank means [`DEFAULT_QUERY`].
    pub query: String,
    /// Restrict to one department.
    pub department_id: Option<DepartmentId>,
    /// Only objects with images.
    pub has_images: bool,
    /// Only highlighted objects.
    pub is_highlight: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            department_id: None,
            has_images: true,
            is_highlight: false,
        }
    }
}

impl SearchQuery {
    /// Search for `query` with the default flags.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// The `q` value actually sent: trimmed query, or [`DEFAULT_QUERY`].
    pub fn effective_query(&self) -> &str {
        let trimmed = self.query.trim();
        if trimmed.is_empty() {
            DEFAULT_QUERY
        } else {
            trimmed
        }
    }

    /// Query-string pairs in the order the endpoint documents them.
    ///
    /// Flags are only sent when set; `departmentId` only when present.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.effective_query().to_owned())];
        if self.has_images {
            pairs.push(("hasImages", String::from("true")));
        }
        if self.is_highlight {
            pairs.push(("isHighlight", String::from("true")));
        }
        if let Some(department_id) = self.department_id {
            pairs.push(("departmentId", department_id.to_string()));
        }
        pairs
    }
}
