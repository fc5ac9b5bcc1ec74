//! Account store

use async_trait::async_trait;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::AppResult,
    models::account::{Account, Role},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountsStore: Send + Sync {
    async fn accounts_get_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;
    /// Case-insensitive lookup (login key)
    async fn accounts_get_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn accounts_create(&self, email: &str, password_hash: &str, role: Role)
        -> AppResult<Account>;
    async fn accounts_list(&self) -> AppResult<Vec<Account>>;
    async fn accounts_set_role(&self, id: Uuid, role: Role) -> AppResult<Option<Account>>;
}

#[async_trait]
impl AccountsStore for Repository {
    async fn accounts_get_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn accounts_get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await?;
        Ok(account)
    }

    async fn accounts_create(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> AppResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn accounts_list(&self) -> AppResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY email")
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn accounts_set_role(&self, id: Uuid, role: Role) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET role = $1 WHERE id = $2 RETURNING *",
        )
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }
}
