//! Author model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookRef;

/// Full author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub version: i32,
    /// Number of linked books
    pub book_count: i64,
}

impl Author {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

/// Author as listed on a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorSummary {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

/// Author with the books it is linked to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorDetails {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub version: i32,
    pub books: Vec<BookRef>,
}

impl AuthorDetails {
    pub fn new(author: Author, books: Vec<BookRef>) -> Self {
        Self {
            full_name: author.full_name(),
            id: author.id,
            first_name: author.first_name,
            last_name: author.last_name,
            version: author.version,
            books,
        }
    }
}

/// Create author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name is required (max 100 characters)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required (max 100 characters)"))]
    pub last_name: String,
}

/// Update author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    pub id: i32,
    pub version: i32,
    #[validate(length(min = 1, max = 100, message = "First name is required (max 100 characters)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required (max 100 characters)"))]
    pub last_name: String,
}

pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name, last_name)
}
