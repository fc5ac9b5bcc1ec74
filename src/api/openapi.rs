//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{accounts, auth, authors, books, borrowings, genres, health, publishers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library catalog and borrowing REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Accounts
        accounts::list_accounts,
        accounts::update_role,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Genres
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre,
        // Publishers
        publishers::list_publishers,
        publishers::get_publisher,
        publishers::create_publisher,
        publishers::update_publisher,
        publishers::delete_publisher,
        // Borrowings
        borrowings::list_borrowings,
        borrowings::get_borrowing,
        borrowings::create_borrowing,
        borrowings::update_borrowing,
        borrowings::approve_borrowing,
        borrowings::return_borrowing,
        borrowings::delete_borrowing,
    ),
    components(
        schemas(
            // Accounts
            crate::models::account::Role,
            crate::models::account::AccountInfo,
            crate::models::account::RegisterRequest,
            crate::models::account::LoginRequest,
            crate::models::account::LoginResponse,
            crate::models::account::UpdateRole,
            // Catalog
            crate::models::book::Book,
            crate::models::book::BookRef,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::author::Author,
            crate::models::author::AuthorSummary,
            crate::models::author::AuthorDetails,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::genre::Genre,
            crate::models::genre::GenreDetails,
            crate::models::genre::CreateGenre,
            crate::models::genre::UpdateGenre,
            crate::models::publisher::Publisher,
            crate::models::publisher::PublisherDetails,
            crate::models::publisher::CreatePublisher,
            crate::models::publisher::UpdatePublisher,
            // Borrowings
            crate::models::borrowing::Borrowing,
            crate::models::borrowing::BorrowingStatus,
            crate::models::borrowing::CreateBorrowing,
            crate::models::borrowing::UpdateBorrowing,
            // Pages
            crate::api::BookPage,
            crate::api::AuthorPage,
            crate::api::GenrePage,
            crate::api::PublisherPage,
            crate::api::BorrowingPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "accounts", description = "Account directory (admin)"),
        (name = "books", description = "Book catalog"),
        (name = "authors", description = "Authors"),
        (name = "genres", description = "Genres"),
        (name = "publishers", description = "Publishers"),
        (name = "borrowings", description = "Borrowing requests and returns")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by secured paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
