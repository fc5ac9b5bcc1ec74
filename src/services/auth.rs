//! Authentication and account management service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::account::{
        Account, AccountInfo, LoginRequest, LoginResponse, RegisterRequest, Role, UserClaims,
    },
    policy::{authorize, Action, Resource},
    repository::AccountsStore,
};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountsStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountsStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Self-service sign-up; new accounts are always plain users
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AccountInfo> {
        request.validate()?;

        if self.store.accounts_get_by_email(&request.email).await?.is_some() {
            return Err(AppError::Validation("Email already registered".to_string()));
        }

        let hash = hash_password(&request.password)?;
        let account = self
            .store
            .accounts_create(&request.email, &hash, Role::User)
            .await?;
        tracing::info!("Account registered: {}", account.email);
        Ok(account.into())
    }

    /// Verify credentials and issue a JWT
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let account = self
            .store
            .accounts_get_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&account, &request.password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let claims = UserClaims::new(&account, self.config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::debug!("Login succeeded for {}", account.email);
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_hours as i64 * 3600,
            account: account.into(),
        })
    }

    pub async fn me(&self, caller: &UserClaims) -> AppResult<AccountInfo> {
        self.store
            .accounts_get_by_id(caller.user_id)
            .await?
            .map(AccountInfo::from)
            .ok_or_else(|| AppError::NotFound("Account no longer exists".to_string()))
    }

    /// Replace the role carried by a token with the account's current role
    pub async fn refresh_role(&self, mut claims: UserClaims) -> AppResult<UserClaims> {
        let account = self
            .store
            .accounts_get_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;
        if account.role != claims.role {
            tracing::debug!(
                "Token role {} superseded by {} for {}",
                claims.role,
                account.role,
                account.email
            );
            claims.role = account.role;
        }
        Ok(claims)
    }

    pub async fn list_accounts(&self, caller: &UserClaims) -> AppResult<Vec<AccountInfo>> {
        authorize(caller, Action::Read, Resource::Accounts)?;
        let accounts = self.store.accounts_list().await?;
        Ok(accounts.into_iter().map(AccountInfo::from).collect())
    }

    pub async fn set_role(&self, caller: &UserClaims, id: Uuid, role: Role) -> AppResult<AccountInfo> {
        authorize(caller, Action::Update, Resource::Accounts)?;
        let account = self
            .store
            .accounts_set_role(id, role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;
        tracing::info!("Account {} is now {}", account.email, account.role);
        Ok(account.into())
    }

    /// Make sure an administrator account exists for `email`
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<Account> {
        match self.store.accounts_get_by_email(email).await? {
            Some(account) if account.role == Role::Admin => Ok(account),
            Some(account) => {
                tracing::info!("Promoting {} to Admin", account.email);
                self.store
                    .accounts_set_role(account.id, Role::Admin)
                    .await?
                    .ok_or_else(|| AppError::Internal("Admin account vanished".to_string()))
            }
            None => {
                let hash = hash_password(password)?;
                let account = self.store.accounts_create(email, &hash, Role::Admin).await?;
                tracing::info!("Admin account created: {}", account.email);
                Ok(account)
            }
        }
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(account: &Account, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&account.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        repository::accounts::MockAccountsStore,
        services::test_support::{admin, user},
    };

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 2,
        }
    }

    fn stored(email: &str, password: &str, role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let account = stored("a@b.io", "secret1", Role::User);
        assert!(verify_password(&account, "secret1").unwrap());
        assert!(!verify_password(&account, "wrong").unwrap());
    }

    #[tokio::test]
    async fn register_creates_plain_user() {
        let mut store = MockAccountsStore::new();
        store.expect_accounts_get_by_email().returning(|_| Ok(None));
        store
            .expect_accounts_create()
            .withf(|email, hash, role| {
                email == "new@library.com" && hash.starts_with("$argon2") && *role == Role::User
            })
            .returning(|email, hash, role| {
                Ok(Account {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    password_hash: hash.to_string(),
                    role,
                    created_at: Utc::now(),
                })
            });

        let info = AuthService::new(Arc::new(store), config())
            .register(RegisterRequest {
                email: "new@library.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(info.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let mut store = MockAccountsStore::new();
        store
            .expect_accounts_get_by_email()
            .returning(|email| Ok(Some(stored(email, "secret1", Role::User))));
        store.expect_accounts_create().never();

        let err = AuthService::new(Arc::new(store), config())
            .register(RegisterRequest {
                email: "taken@library.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn login_issues_token_carrying_role() {
        let account = stored("admin@library.com", "Admin123!", Role::Admin);
        let account_id = account.id;
        let mut store = MockAccountsStore::new();
        store
            .expect_accounts_get_by_email()
            .returning(move |_| Ok(Some(account.clone())));

        let response = AuthService::new(Arc::new(store), config())
            .login(LoginRequest {
                email: "admin@library.com".to_string(),
                password: "Admin123!".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.expires_in, 7200);
        let claims = UserClaims::from_token(&response.token, "test-secret").unwrap();
        assert_eq!(claims.user_id, account_id);
        assert!(claims.is_admin());
    }

    #[tokio::test]
    async fn wrong_password_is_an_authentication_error() {
        let account = stored("reader@library.com", "secret1", Role::User);
        let mut store = MockAccountsStore::new();
        store
            .expect_accounts_get_by_email()
            .returning(move |_| Ok(Some(account.clone())));

        let err = AuthService::new(Arc::new(store), config())
            .login(LoginRequest {
                email: "reader@library.com".to_string(),
                password: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn account_directory_is_admin_only() {
        let mut store = MockAccountsStore::new();
        store.expect_accounts_list().returning(|| Ok(vec![]));
        let service = AuthService::new(Arc::new(store), config());

        assert!(service.list_accounts(&admin()).await.is_ok());
        assert!(matches!(
            service.list_accounts(&user()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn demoted_admin_token_loses_admin_rights() {
        let caller = admin();
        let mut store = MockAccountsStore::new();
        store
            .expect_accounts_get_by_id()
            .returning(|id| {
                let mut account = stored("former@library.com", "x", Role::User);
                account.id = id;
                Ok(Some(account))
            });
        store.expect_accounts_list().never();
        let service = AuthService::new(Arc::new(store), config());

        let claims = service.refresh_role(caller).await.unwrap();
        assert_eq!(claims.role, Role::User);
        assert!(matches!(
            service.list_accounts(&claims).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn token_of_deleted_account_is_rejected() {
        let mut store = MockAccountsStore::new();
        store.expect_accounts_get_by_id().returning(|_| Ok(None));

        let err = AuthService::new(Arc::new(store), config())
            .refresh_role(admin())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn ensure_admin_promotes_existing_user() {
        let mut store = MockAccountsStore::new();
        store
            .expect_accounts_get_by_email()
            .returning(|email| Ok(Some(stored(email, "x", Role::User))));
        store
            .expect_accounts_set_role()
            .withf(|_, role| *role == Role::Admin)
            .returning(|id, role| {
                let mut account = stored("admin@library.com", "x", role);
                account.id = id;
                Ok(Some(account))
            });
        store.expect_accounts_create().never();

        let account = AuthService::new(Arc::new(store), config())
            .ensure_admin("admin@library.com", "Admin123!")
            .await
            .unwrap();
        assert_eq!(account.role, Role::Admin);
    }
}
