//! Borrowing store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::borrowing::{Borrowing, BorrowingQuery, BorrowingStatus, NewBorrowing, UpdateBorrowing},
};

const BORROWING_SELECT: &str = r#"
    SELECT br.id, br.book_id, b.title AS book_title,
           br.user_id, a.email AS user_email,
           br.borrow_date, br.return_date, br.status, br.version
    FROM borrowings br
    JOIN books b ON b.id = br.book_id
    JOIN accounts a ON a.id = br.user_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowingsStore: Send + Sync {
    async fn borrowings_search(&self, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, i64)>;
    async fn borrowings_get_by_id(&self, id: i32) -> AppResult<Option<Borrowing>>;
    async fn borrowings_create(&self, data: &NewBorrowing) -> AppResult<Borrowing>;
    /// Applies the present fields; `None` on a stale version
    async fn borrowings_update(
        &self,
        id: i32,
        data: &UpdateBorrowing,
    ) -> AppResult<Option<Borrowing>>;
    /// Workflow step (approve / return); `None` on a stale version
    async fn borrowings_set_status(
        &self,
        id: i32,
        version: i32,
        status: BorrowingStatus,
        return_date: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Borrowing>>;
    async fn borrowings_delete(&self, id: i32) -> AppResult<bool>;
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BorrowingQuery) {
    builder.push(" WHERE 1=1");

    if let Some(user_id) = query.user_id {
        builder.push(" AND br.user_id = ").push_bind(user_id);
    }

    if let Some(status) = query.status {
        builder.push(" AND br.status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl BorrowingsStore for Repository {
    async fn borrowings_search(&self, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, i64)> {
        let window = query.window();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrowings br");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(BORROWING_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY br.borrow_date DESC, br.id DESC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let borrowings = select
            .build_query_as::<Borrowing>()
            .fetch_all(&self.pool)
            .await?;

        Ok((borrowings, total))
    }

    async fn borrowings_get_by_id(&self, id: i32) -> AppResult<Option<Borrowing>> {
        let borrowing =
            sqlx::query_as::<_, Borrowing>(&format!("{} WHERE br.id = $1", BORROWING_SELECT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(borrowing)
    }

    async fn borrowings_create(&self, data: &NewBorrowing) -> AppResult<Borrowing> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO borrowings (book_id, user_id, borrow_date, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(data.book_id)
        .bind(data.user_id)
        .bind(data.borrow_date)
        .bind(data.status)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Borrowing {} created for book {} by {}",
            id,
            data.book_id,
            data.user_id
        );

        self.borrowings_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Borrowing {} vanished after insert", id)))
    }

    async fn borrowings_update(
        &self,
        id: i32,
        data: &UpdateBorrowing,
    ) -> AppResult<Option<Borrowing>> {
        let (set_return_date, return_date) = match data.return_date {
            Some(value) => (true, value),
            None => (false, None),
        };

        let updated = sqlx::query(
            r#"
            UPDATE borrowings SET
                book_id = COALESCE($1, book_id),
                user_id = COALESCE($2, user_id),
                status = COALESCE($3, status),
                borrow_date = COALESCE($4, borrow_date),
                return_date = CASE WHEN $5 THEN $6 ELSE return_date END,
                version = version + 1
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(data.book_id)
        .bind(data.user_id)
        .bind(data.status.map(|s| s.as_str()))
        .bind(data.borrow_date)
        .bind(set_return_date)
        .bind(return_date)
        .bind(id)
        .bind(data.version)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.borrowings_get_by_id(id).await
    }

    async fn borrowings_set_status(
        &self,
        id: i32,
        version: i32,
        status: BorrowingStatus,
        return_date: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Borrowing>> {
        let updated = sqlx::query(
            r#"
            UPDATE borrowings SET status = $1, return_date = $2, version = version + 1
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(status)
        .bind(return_date)
        .bind(id)
        .bind(version)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.borrowings_get_by_id(id).await
    }

    async fn borrowings_delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM borrowings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
