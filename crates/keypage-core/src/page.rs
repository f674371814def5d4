//! Paginated result sets.

use serde::{Deserialize, Serialize};

/// A page of results with the tokens to navigate around it.
///
/// Tokens are `None` when no such page exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// The records of this page, in natural order.
    pub results: Vec<T>,
    /// Number of records matching the base query across all pages.
    pub total_count: usize,
    /// Token that produced this page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_token: Option<String>,
    /// Token for the page before this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_token: Option<String>,
    /// Token for the page after this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl<T> PageResult<T> {
    /// Creates a page without navigation tokens.
    pub fn new(results: Vec<T>, total_count: usize) -> Self {
        Self {
            results,
            total_count,
            current_token: None,
            previous_token: None,
            next_token: None,
        }
    }

    /// Creates an empty page.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// Re-wraps `results` around the pagination metadata of `first`.
    ///
    /// Supports the two-phase pattern where a first query pages over
    /// identifiers and a second query loads the detailed records.
    pub fn from_first<U>(first: &PageResult<U>, results: Vec<T>) -> Self {
        Self {
            results,
            total_count: first.total_count,
            current_token: first.current_token.clone(),
            previous_token: first.previous_token.clone(),
            next_token: first.next_token.clone(),
        }
    }

    /// Sets the token that produced this page.
    pub fn with_current_token(mut self, token: Option<String>) -> Self {
        self.current_token = token;
        self
    }

    /// Sets the token for the previous page.
    pub fn with_previous_token(mut self, token: Option<String>) -> Self {
        self.previous_token = token;
        self
    }

    /// Sets the token for the next page.
    pub fn with_next_token(mut self, token: Option<String>) -> Self {
        self.next_token = token;
        self
    }

    /// Returns true if a next page exists.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next_token.is_some()
    }

    /// Returns true if a previous page exists.
    #[inline]
    pub fn has_previous(&self) -> bool {
        self.previous_token.is_some()
    }

    /// Maps the results to a different type, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> PageResult<U>
    where
        F: FnMut(T) -> U,
    {
        PageResult {
            results: self.results.into_iter().map(f).collect(),
            total_count: self.total_count,
            current_token: self.current_token,
            previous_token: self.previous_token,
            next_token: self.next_token,
        }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}
