//! Borrowing model and lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::PageWindow;

/// Borrowing lifecycle: Pending -> Active -> Returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BorrowingStatus {
    Pending,
    Active,
    Returned,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Pending => "Pending",
            BorrowingStatus::Active => "Active",
            BorrowingStatus::Returned => "Returned",
        }
    }

    /// Check a workflow transition (approve / return)
    pub fn transition(self, next: BorrowingStatus) -> AppResult<BorrowingStatus> {
        use BorrowingStatus::*;
        match (self, next) {
            (Pending, Active) | (Active, Returned) => Ok(next),
            _ => Err(AppError::Validation(format!(
                "Borrowing cannot move from {} to {}",
                self, next
            ))),
        }
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BorrowingStatus::Pending),
            "active" => Ok(BorrowingStatus::Active),
            "returned" => Ok(BorrowingStatus::Returned),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for BorrowingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Borrowing record with book title and borrower email resolved
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    pub version: i32,
}

/// Borrow request. Status and dates are always set by the server.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    pub book_id: i32,
    /// Borrower; defaults to the caller. Admins may borrow on behalf of others.
    pub user_id: Option<Uuid>,
}

/// Row to insert, as decided by the service
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrowing {
    pub book_id: i32,
    pub user_id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub status: BorrowingStatus,
}

impl NewBorrowing {
    pub fn pending(book_id: i32, user_id: Uuid) -> Self {
        Self {
            book_id,
            user_id,
            borrow_date: Utc::now(),
            status: BorrowingStatus::Pending,
        }
    }
}

/// Admin edit of a borrowing; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBorrowing {
    pub id: i32,
    pub version: i32,
    pub book_id: Option<i32>,
    pub user_id: Option<Uuid>,
    pub status: Option<BorrowingStatus>,
    pub borrow_date: Option<DateTime<Utc>>,
    /// `null` clears the return date
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub return_date: Option<Option<DateTime<Utc>>>,
}

/// Distinguishes an explicit `null` from a missing field
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Borrowing list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    /// Only honoured for admins; users always see their own rows
    pub user_id: Option<Uuid>,
    pub status: Option<BorrowingStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BorrowingQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.per_page)
    }
}
