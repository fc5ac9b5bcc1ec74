//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrowing::{Borrowing, BorrowingQuery, CreateBorrowing, UpdateBorrowing},
};

use super::{AuthenticatedUser, BorrowingPage, PaginatedResponse};

/// List borrowings; readers only see their own
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Page of borrowings", body = BorrowingPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<PaginatedResponse<Borrowing>>> {
    let (borrowings, total) = state.services.borrowings.list(&claims, &query).await?;
    Ok(Json(PaginatedResponse::new(borrowings, total, query.window())))
}

#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing", body = Borrowing),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.borrowings.get(&claims, id).await?;
    Ok(Json(borrowing))
}

/// Request a book; the borrowing starts Pending
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing requested", body = Borrowing),
        (status = 400, description = "Unknown book or account"),
        (status = 403, description = "Cannot borrow for another account")
    )
)]
pub async fn create_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    let borrowing = state.services.borrowings.create(&claims, data).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Edit a borrowing (admin)
#[utoipa::path(
    put,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    request_body = UpdateBorrowing,
    responses(
        (status = 200, description = "Borrowing updated", body = Borrowing),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Stale version")
    )
)]
pub async fn update_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBorrowing>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.borrowings.update(&claims, id, data).await?;
    Ok(Json(borrowing))
}

/// Approve a pending request (admin)
#[utoipa::path(
    post,
    path = "/borrowings/{id}/approve",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing is active", body = Borrowing),
        (status = 400, description = "Borrowing is not pending"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn approve_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.borrowings.approve(&claims, id).await?;
    Ok(Json(borrowing))
}

/// Mark an active borrowing as returned (admin)
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing returned", body = Borrowing),
        (status = 400, description = "Borrowing is not active"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn return_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.borrowings.return_book(&claims, id).await?;
    Ok(Json(borrowing))
}

#[utoipa::path(
    delete,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 204, description = "Borrowing deleted"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn delete_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.borrowings.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
