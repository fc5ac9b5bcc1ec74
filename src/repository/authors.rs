//! Author store

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{contains_pattern, Repository};
use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::BookRef,
        non_blank, SearchQuery,
    },
};

const AUTHOR_SELECT: &str = r#"
    SELECT a.id, a.first_name, a.last_name, a.version,
           (SELECT COUNT(*) FROM book_authors ba WHERE ba.author_id = a.id) AS book_count
    FROM authors a
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorsStore: Send + Sync {
    async fn authors_search(&self, query: &SearchQuery) -> AppResult<(Vec<Author>, i64)>;
    async fn authors_get_by_id(&self, id: i32) -> AppResult<Option<Author>>;
    async fn authors_books(&self, id: i32) -> AppResult<Vec<BookRef>>;
    /// Ids from `ids` that have no author row
    async fn authors_missing(&self, ids: &[i32]) -> AppResult<Vec<i32>>;
    async fn authors_create(&self, data: &CreateAuthor) -> AppResult<Author>;
    async fn authors_update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Option<Author>>;
    /// Unlinks the author from every book, then removes it
    async fn authors_delete(&self, id: i32) -> AppResult<bool>;
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &SearchQuery) {
    builder.push(" WHERE 1=1");
    if let Some(term) = non_blank(&query.search) {
        let pattern = contains_pattern(term);
        builder
            .push(" AND (a.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl AuthorsStore for Repository {
    async fn authors_search(&self, query: &SearchQuery) -> AppResult<(Vec<Author>, i64)> {
        let window = query.window();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM authors a");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(AUTHOR_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY a.last_name, a.first_name LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let authors = select
            .build_query_as::<Author>()
            .fetch_all(&self.pool)
            .await?;

        Ok((authors, total))
    }

    async fn authors_get_by_id(&self, id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(&format!("{} WHERE a.id = $1", AUTHOR_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    async fn authors_books(&self, id: i32) -> AppResult<Vec<BookRef>> {
        let books = sqlx::query_as::<_, BookRef>(
            r#"
            SELECT b.id, b.title, b.isbn
            FROM book_authors ba
            JOIN books b ON b.id = ba.book_id
            WHERE ba.author_id = $1
            ORDER BY b.title
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn authors_missing(&self, ids: &[i32]) -> AppResult<Vec<i32>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let missing: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT requested.id
            FROM UNNEST($1::int[]) AS requested(id)
            WHERE NOT EXISTS (SELECT 1 FROM authors a WHERE a.id = requested.id)
            ORDER BY requested.id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(missing)
    }

    async fn authors_create(&self, data: &CreateAuthor) -> AppResult<Author> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO authors (first_name, last_name) VALUES ($1, $2) RETURNING id",
        )
        .bind(data.first_name.trim())
        .bind(data.last_name.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(Author {
            id,
            first_name: data.first_name.trim().to_string(),
            last_name: data.last_name.trim().to_string(),
            version: 1,
            book_count: 0,
        })
    }

    async fn authors_update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Option<Author>> {
        let updated = sqlx::query(
            r#"
            UPDATE authors SET first_name = $1, last_name = $2, version = version + 1
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(data.first_name.trim())
        .bind(data.last_name.trim())
        .bind(id)
        .bind(data.version)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.authors_get_by_id(id).await
    }

    async fn authors_delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let unlinked = sqlx::query("DELETE FROM book_authors WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        tracing::debug!(
            "Author {} deleted, {} book links removed",
            id,
            unlinked.rows_affected()
        );
        Ok(true)
    }
}
