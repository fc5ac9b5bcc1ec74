//! Book model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::AuthorSummary, PageWindow};

/// Book with its genre, publisher and authors resolved
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: Option<String>,
    pub genre_id: i32,
    pub genre_name: String,
    pub publisher_id: i32,
    pub publisher_name: String,
    pub published_date: Option<NaiveDate>,
    pub description: Option<String>,
    /// Optimistic concurrency token, echoed back on update
    pub version: i32,
    #[sqlx(skip)]
    pub authors: Vec<AuthorSummary>,
}

impl Book {
    pub fn author_ids(&self) -> Vec<i32> {
        self.authors.iter().map(|a| a.id).collect()
    }
}

/// Minimal book reference used in genre, publisher and author details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookRef {
    pub id: i32,
    pub title: String,
    pub isbn: Option<String>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<String>,
    pub genre_id: i32,
    pub publisher_id: i32,
    pub published_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(default)]
    pub author_ids: Vec<i32>,
}

/// Update book request; replaces every field and the author set
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    pub id: i32,
    pub version: i32,
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<String>,
    pub genre_id: i32,
    pub publisher_id: i32,
    pub published_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(default)]
    pub author_ids: Vec<i32>,
}

/// Book list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Substring of the title or ISBN
    pub search: Option<String>,
    pub genre_id: Option<i32>,
    pub publisher_id: Option<i32>,
    pub author_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.per_page)
    }
}

/// Sorted, de-duplicated author ids
pub fn normalize_author_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_required() {
        let book = CreateBook {
            title: String::new(),
            isbn: None,
            genre_id: 1,
            publisher_id: 1,
            published_date: None,
            description: None,
            author_ids: vec![],
        };
        assert!(book.validate().is_err());
    }

    #[test]
    fn author_ids_default_to_empty() {
        let book: CreateBook =
            serde_json::from_str(r#"{"title":"Dune","genre_id":1,"publisher_id":2}"#).unwrap();
        assert!(book.author_ids.is_empty());
        assert!(book.validate().is_ok());
    }

    #[test]
    fn duplicate_author_ids_collapse() {
        assert_eq!(normalize_author_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }
}
