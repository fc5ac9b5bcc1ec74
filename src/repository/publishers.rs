//! Publisher store

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{contains_pattern, Repository};
use crate::{
    error::AppResult,
    models::{
        book::BookRef,
        non_blank,
        publisher::{CreatePublisher, Publisher, UpdatePublisher},
        SearchQuery,
    },
};

const PUBLISHER_SELECT: &str = r#"
    SELECT p.id, p.name, p.version,
           (SELECT COUNT(*) FROM books b WHERE b.publisher_id = p.id) AS book_count
    FROM publishers p
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublishersStore: Send + Sync {
    async fn publishers_search(&self, query: &SearchQuery) -> AppResult<(Vec<Publisher>, i64)>;
    async fn publishers_get_by_id(&self, id: i32) -> AppResult<Option<Publisher>>;
    /// Books issued by the publisher
    async fn publishers_books(&self, id: i32) -> AppResult<Vec<BookRef>>;
    async fn publishers_name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    async fn publishers_create(&self, data: &CreatePublisher) -> AppResult<Publisher>;
    /// `None` when no row matched both id and version
    async fn publishers_update(&self, id: i32, data: &UpdatePublisher) -> AppResult<Option<Publisher>>;
    async fn publishers_count_books(&self, id: i32) -> AppResult<i64>;
    async fn publishers_delete(&self, id: i32) -> AppResult<bool>;
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &SearchQuery) {
    builder.push(" WHERE 1=1");
    if let Some(term) = non_blank(&query.search) {
        builder.push(" AND p.name ILIKE ").push_bind(contains_pattern(term));
    }
}

#[async_trait]
impl PublishersStore for Repository {
    async fn publishers_search(&self, query: &SearchQuery) -> AppResult<(Vec<Publisher>, i64)> {
        let window = query.window();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM publishers p");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(PUBLISHER_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY p.name LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let publishers = select
            .build_query_as::<Publisher>()
            .fetch_all(&self.pool)
            .await?;

        Ok((publishers, total))
    }

    async fn publishers_get_by_id(&self, id: i32) -> AppResult<Option<Publisher>> {
        let publisher = sqlx::query_as::<_, Publisher>(&format!("{} WHERE p.id = $1", PUBLISHER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(publisher)
    }

    async fn publishers_books(&self, id: i32) -> AppResult<Vec<BookRef>> {
        let books = sqlx::query_as::<_, BookRef>(
            "SELECT id, title, isbn FROM books WHERE publisher_id = $1 ORDER BY title",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn publishers_name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM publishers WHERE LOWER(name) = LOWER($1) AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn publishers_create(&self, data: &CreatePublisher) -> AppResult<Publisher> {
        let id: i32 = sqlx::query_scalar("INSERT INTO publishers (name) VALUES ($1) RETURNING id")
            .bind(data.name.trim())
            .fetch_one(&self.pool)
            .await?;

        Ok(Publisher {
            id,
            name: data.name.trim().to_string(),
            version: 1,
            book_count: 0,
        })
    }

    async fn publishers_update(&self, id: i32, data: &UpdatePublisher) -> AppResult<Option<Publisher>> {
        let updated = sqlx::query(
            "UPDATE publishers SET name = $1, version = version + 1 WHERE id = $2 AND version = $3",
        )
        .bind(data.name.trim())
        .bind(id)
        .bind(data.version)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.publishers_get_by_id(id).await
    }

    async fn publishers_count_books(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE publisher_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn publishers_delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
