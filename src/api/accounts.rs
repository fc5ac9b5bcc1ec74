//! Account directory endpoints (admin only)

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::account::{AccountInfo, UpdateRole},
};

use super::AuthenticatedUser;

/// List all accounts
#[utoipa::path(
    get,
    path = "/accounts",
    tag = "accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All accounts", body = Vec<AccountInfo>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_accounts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<AccountInfo>>> {
    let accounts = state.services.auth.list_accounts(&claims).await?;
    Ok(Json(accounts))
}

/// Change the role of an account
#[utoipa::path(
    put,
    path = "/accounts/{id}/role",
    tag = "accounts",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = AccountInfo),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn update_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateRole>,
) -> AppResult<Json<AccountInfo>> {
    let account = state.services.auth.set_role(&claims, id, data.role).await?;
    Ok(Json(account))
}
