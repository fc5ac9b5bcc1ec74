//! Book store, including the book_authors junction

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};

use super::{contains_pattern, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::AuthorSummary,
        book::{normalize_author_ids, Book, BookQuery, CreateBook, UpdateBook},
        non_blank,
    },
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn,
           b.genre_id, g.name AS genre_name,
           b.publisher_id, p.name AS publisher_name,
           b.published_date, b.description, b.version
    FROM books b
    JOIN genres g ON g.id = b.genre_id
    JOIN publishers p ON p.id = b.publisher_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksStore: Send + Sync {
    async fn books_search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    async fn books_get_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    /// Inserts the book and its author links in one transaction
    async fn books_create(&self, data: &CreateBook) -> AppResult<Book>;
    /// Overwrites the book and replaces its author set; `None` on a stale version
    async fn books_update(&self, id: i32, data: &UpdateBook) -> AppResult<Option<Book>>;
    async fn books_count_borrowings(&self, id: i32) -> AppResult<i64>;
    /// Removes the author links, then the book
    async fn books_delete(&self, id: i32) -> AppResult<bool>;
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    builder.push(" WHERE 1=1");

    if let Some(term) = non_blank(&query.search) {
        let pattern = contains_pattern(term);
        builder
            .push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.isbn ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(genre_id) = query.genre_id {
        builder.push(" AND b.genre_id = ").push_bind(genre_id);
    }

    if let Some(publisher_id) = query.publisher_id {
        builder.push(" AND b.publisher_id = ").push_bind(publisher_id);
    }

    if let Some(author_id) = query.author_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM book_authors ba WHERE ba.book_id = b.id AND ba.author_id = ")
            .push_bind(author_id)
            .push(")");
    }
}

async fn link_authors(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    author_ids: &[i32],
) -> AppResult<()> {
    let author_ids = normalize_author_ids(author_ids);
    if author_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO book_authors (book_id, author_id)
        SELECT $1, UNNEST($2::int[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(book_id)
    .bind(&author_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl Repository {
    /// Load the author lists of several books with one query
    async fn attach_authors(&self, books: &mut [Book]) -> AppResult<()> {
        if books.is_empty() {
            return Ok(());
        }

        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
        let rows = sqlx::query(
            r#"
            SELECT ba.book_id, a.id, a.first_name, a.last_name,
                   a.first_name || ' ' || a.last_name AS full_name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.last_name, a.first_name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_book: HashMap<i32, Vec<AuthorSummary>> = HashMap::new();
        for row in rows {
            by_book
                .entry(row.get("book_id"))
                .or_default()
                .push(AuthorSummary {
                    id: row.get("id"),
                    first_name: row.get("first_name"),
                    last_name: row.get("last_name"),
                    full_name: row.get("full_name"),
                });
        }

        for book in books.iter_mut() {
            book.authors = by_book.remove(&book.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl BooksStore for Repository {
    async fn books_search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let window = query.window();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY b.title, b.id LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let mut books = select
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Book search matched {} rows, returning {}", total, books.len());

        self.attach_authors(&mut books).await?;
        Ok((books, total))
    }

    async fn books_get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match book {
            Some(book) => {
                let mut books = [book];
                self.attach_authors(&mut books).await?;
                let [book] = books;
                Ok(Some(book))
            }
            None => Ok(None),
        }
    }

    async fn books_create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, isbn, genre_id, publisher_id, published_date, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.isbn)
        .bind(data.genre_id)
        .bind(data.publisher_id)
        .bind(data.published_date)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        link_authors(&mut tx, id, &data.author_ids).await?;
        tx.commit().await?;

        self.books_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", id)))
    }

    async fn books_update(&self, id: i32, data: &UpdateBook) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE books SET
                title = $1,
                isbn = $2,
                genre_id = $3,
                publisher_id = $4,
                published_date = $5,
                description = $6,
                version = version + 1
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.isbn)
        .bind(data.genre_id)
        .bind(data.publisher_id)
        .bind(data.published_date)
        .bind(&data.description)
        .bind(id)
        .bind(data.version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_authors(&mut tx, id, &data.author_ids).await?;

        tx.commit().await?;
        self.books_get_by_id(id).await
    }

    async fn books_count_borrowings(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrowings WHERE book_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn books_delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
