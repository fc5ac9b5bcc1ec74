//! Data models for the library catalog

pub mod account;
pub mod author;
pub mod book;
pub mod borrowing;
pub mod genre;
pub mod publisher;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

// Re-export commonly used types
pub use account::{Account, AccountInfo, Role, UserClaims};
pub use author::{Author, AuthorDetails};
pub use book::{Book, BookRef};
pub use borrowing::{Borrowing, BorrowingStatus};
pub use genre::{Genre, GenreDetails};
pub use publisher::{Publisher, PublisherDetails};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Resolved pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
}

impl PageWindow {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Name search used by the author, genre and publisher listings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring match on the name
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl SearchQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.per_page)
    }
}

/// Blank search strings behave as "no filter"
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_defaults_and_clamps() {
        assert_eq!(PageWindow::new(None, None), PageWindow { page: 1, per_page: 20 });
        assert_eq!(PageWindow::new(Some(0), Some(1000)), PageWindow { page: 1, per_page: 100 });
        assert_eq!(PageWindow::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(PageWindow::new(Some(i64::MAX), Some(100)).offset(), i64::MAX);
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&Some(" king ".to_string())), Some("king"));
        assert_eq!(non_blank(&None), None);
    }
}
