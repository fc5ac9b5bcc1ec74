//! API handlers for the library REST endpoints

pub mod accounts;
pub mod auth;
pub mod authors;
pub mod books;
pub mod borrowings;
pub mod genres;
pub mod health;
pub mod openapi;
pub mod publishers;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{Author, Book, Borrowing, Genre, PageWindow, Publisher, UserClaims},
    AppState,
};

/// Extractor for the authenticated caller from the JWT bearer token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        // Admin tokens follow the account's current role
        let claims = if claims.is_admin() {
            state.services.auth.refresh_role(claims).await?
        } else {
            claims
        };

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(
    BookPage = PaginatedResponse<Book>,
    AuthorPage = PaginatedResponse<Author>,
    GenrePage = PaginatedResponse<Genre>,
    PublisherPage = PaginatedResponse<Publisher>,
    BorrowingPage = PaginatedResponse<Borrowing>
)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Rows of the requested page
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Rows per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, window: PageWindow) -> Self {
        Self {
            items,
            total,
            page: window.page,
            per_page: window.per_page,
        }
    }
}
