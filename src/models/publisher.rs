//! Publisher model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookRef;

/// Publisher with the number of books it published
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Publisher {
    pub id: i32,
    pub name: String,
    pub version: i32,
    pub book_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublisherDetails {
    pub id: i32,
    pub name: String,
    pub version: i32,
    pub books: Vec<BookRef>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePublisher {
    #[validate(length(min = 1, max = 150, message = "Name is required (max 150 characters)"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePublisher {
    pub id: i32,
    pub version: i32,
    #[validate(length(min = 1, max = 150, message = "Name is required (max 150 characters)"))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_longer_than_150_is_rejected() {
        let publisher = CreatePublisher { name: "x".repeat(151) };
        assert!(publisher.validate().is_err());
        let publisher = CreatePublisher { name: "Penguin Books".to_string() };
        assert!(publisher.validate().is_ok());
    }
}
