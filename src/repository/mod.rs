//! Repository layer for database operations
//!
//! Each entity has a store trait consumed by the services; `Repository`
//! implements all of them over one PostgreSQL pool.

pub mod accounts;
pub mod authors;
pub mod books;
pub mod borrowings;
pub mod genres;
pub mod publishers;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

pub use accounts::AccountsStore;
pub use authors::AuthorsStore;
pub use books::BooksStore;
pub use borrowings::BorrowingsStore;
pub use genres::GenresStore;
pub use publishers::PublishersStore;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Round-trip to the database (readiness probe)
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// True when no genres, publishers or authors exist yet
    pub async fn catalog_is_empty(&self) -> AppResult<bool> {
        let populated: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM genres)
                OR EXISTS(SELECT 1 FROM publishers)
                OR EXISTS(SELECT 1 FROM authors)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(!populated)
    }
}

/// `%term%` pattern for ILIKE filters; wildcards in `term` match literally
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_like_wildcards() {
        assert_eq!(contains_pattern("king"), "%king%");
        assert_eq!(contains_pattern("100%"), r"%100\%%");
        assert_eq!(contains_pattern("a_b"), r"%a\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }
}
