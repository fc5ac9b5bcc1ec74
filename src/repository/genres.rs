//! Genre store

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{contains_pattern, Repository};
use crate::{
    error::AppResult,
    models::{
        book::BookRef,
        genre::{CreateGenre, Genre, UpdateGenre},
        non_blank, SearchQuery,
    },
};

const GENRE_SELECT: &str = r#"
    SELECT g.id, g.name, g.version,
           (SELECT COUNT(*) FROM books b WHERE b.genre_id = g.id) AS book_count
    FROM genres g
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenresStore: Send + Sync {
    async fn genres_search(&self, query: &SearchQuery) -> AppResult<(Vec<Genre>, i64)>;
    async fn genres_get_by_id(&self, id: i32) -> AppResult<Option<Genre>>;
    /// Books filed under the genre
    async fn genres_books(&self, id: i32) -> AppResult<Vec<BookRef>>;
    async fn genres_name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    async fn genres_create(&self, data: &CreateGenre) -> AppResult<Genre>;
    /// `None` when no row matched both id and version
    async fn genres_update(&self, id: i32, data: &UpdateGenre) -> AppResult<Option<Genre>>;
    async fn genres_count_books(&self, id: i32) -> AppResult<i64>;
    async fn genres_delete(&self, id: i32) -> AppResult<bool>;
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &SearchQuery) {
    builder.push(" WHERE 1=1");
    if let Some(term) = non_blank(&query.search) {
        builder.push(" AND g.name ILIKE ").push_bind(contains_pattern(term));
    }
}

#[async_trait]
impl GenresStore for Repository {
    async fn genres_search(&self, query: &SearchQuery) -> AppResult<(Vec<Genre>, i64)> {
        let window = query.window();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM genres g");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(GENRE_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY g.name LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let genres = select
            .build_query_as::<Genre>()
            .fetch_all(&self.pool)
            .await?;

        Ok((genres, total))
    }

    async fn genres_get_by_id(&self, id: i32) -> AppResult<Option<Genre>> {
        let genre = sqlx::query_as::<_, Genre>(&format!("{} WHERE g.id = $1", GENRE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(genre)
    }

    async fn genres_books(&self, id: i32) -> AppResult<Vec<BookRef>> {
        let books = sqlx::query_as::<_, BookRef>(
            "SELECT id, title, isbn FROM books WHERE genre_id = $1 ORDER BY title",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn genres_name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM genres WHERE LOWER(name) = LOWER($1) AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn genres_create(&self, data: &CreateGenre) -> AppResult<Genre> {
        let id: i32 = sqlx::query_scalar("INSERT INTO genres (name) VALUES ($1) RETURNING id")
            .bind(data.name.trim())
            .fetch_one(&self.pool)
            .await?;

        Ok(Genre {
            id,
            name: data.name.trim().to_string(),
            version: 1,
            book_count: 0,
        })
    }

    async fn genres_update(&self, id: i32, data: &UpdateGenre) -> AppResult<Option<Genre>> {
        let updated = sqlx::query(
            "UPDATE genres SET name = $1, version = version + 1 WHERE id = $2 AND version = $3",
        )
        .bind(data.name.trim())
        .bind(id)
        .bind(data.version)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.genres_get_by_id(id).await
    }

    async fn genres_count_books(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE genre_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn genres_delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
