//! Library Management Server
//!
//! REST JSON API for a library catalog (books, authors, genres, publishers)
//! and the borrowing workflow between readers and administrators.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    /// Used directly only by the readiness probe
    pub repository: repository::Repository,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Accounts
        .route("/accounts", get(api::accounts::list_accounts))
        .route("/accounts/:id/role", put(api::accounts::update_role))
        // Books
        .route(
            "/books",
            get(api::books::list_books).post(api::books::create_book),
        )
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        // Authors
        .route(
            "/authors",
            get(api::authors::list_authors).post(api::authors::create_author),
        )
        .route(
            "/authors/:id",
            get(api::authors::get_author)
                .put(api::authors::update_author)
                .delete(api::authors::delete_author),
        )
        // Genres
        .route(
            "/genres",
            get(api::genres::list_genres).post(api::genres::create_genre),
        )
        .route(
            "/genres/:id",
            get(api::genres::get_genre)
                .put(api::genres::update_genre)
                .delete(api::genres::delete_genre),
        )
        // Publishers
        .route(
            "/publishers",
            get(api::publishers::list_publishers).post(api::publishers::create_publisher),
        )
        .route(
            "/publishers/:id",
            get(api::publishers::get_publisher)
                .put(api::publishers::update_publisher)
                .delete(api::publishers::delete_publisher),
        )
        // Borrowings
        .route(
            "/borrowings",
            get(api::borrowings::list_borrowings).post(api::borrowings::create_borrowing),
        )
        .route(
            "/borrowings/:id",
            get(api::borrowings::get_borrowing)
                .put(api::borrowings::update_borrowing)
                .delete(api::borrowings::delete_borrowing),
        )
        .route("/borrowings/:id/approve", post(api::borrowings::approve_borrowing))
        .route("/borrowings/:id/return", post(api::borrowings::return_borrowing))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::{repository::Repository, services::Services};

    /// Router over a pool that never connects; only paths that stop before
    /// the database can be exercised.
    fn router() -> Router {
        let config = AppConfig::default();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@localhost:1/none")
            .unwrap();
        let repository = Repository::new(pool);
        let services = Services::new(repository.clone(), config.auth.clone());
        create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
            repository,
        })
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let request = Request::get("/api/v1/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_status_and_version() {
        let request = Request::get("/api/v1/health").body(Body::empty()).unwrap();
        let response = router().oneshot(request).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn catalog_requires_a_token() {
        let request = Request::get("/api/v1/books").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let request = Request::get("/api/v1/borrowings")
            .header(AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_admin_catalog_mutation_is_forbidden() {
        let config = AppConfig::default();
        let claims = models::UserClaims {
            sub: "reader@library.com".to_string(),
            user_id: uuid::Uuid::new_v4(),
            role: models::Role::User,
            exp: chrono::Utc::now().timestamp() + 600,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = claims.create_token(&config.auth.jwt_secret).unwrap();

        let request = Request::delete("/api/v1/genres/1")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::FORBIDDEN);
    }
}
