//! Business logic services

pub mod auth;
pub mod authors;
pub mod books;
pub mod borrowings;
pub mod genres;
pub mod publishers;
pub mod seed;

use std::sync::Arc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub authors: authors::AuthorsService,
    pub genres: genres::GenresService,
    pub publishers: publishers::PublishersService,
    pub borrowings: borrowings::BorrowingsService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        let repository = Arc::new(repository);
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            books: books::BooksService::new(
                repository.clone(),
                repository.clone(),
                repository.clone(),
                repository.clone(),
            ),
            authors: authors::AuthorsService::new(repository.clone()),
            genres: genres::GenresService::new(repository.clone()),
            publishers: publishers::PublishersService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(
                repository.clone(),
                repository.clone(),
                repository,
            ),
        }
    }
}

/// Error for a versioned write that matched no row
pub(crate) fn stale_write(entity: &str, id: i32, still_exists: bool) -> AppError {
    if still_exists {
        AppError::Conflict(format!(
            "{} {} was modified by someone else, reload and retry",
            entity, id
        ))
    } else {
        AppError::NotFound(format!("{} with id {} not found", entity, id))
    }
}

/// Path id and payload id must agree on updates
pub(crate) fn ensure_same_id(path_id: i32, payload_id: i32) -> AppResult<()> {
    if path_id != payload_id {
        return Err(AppError::Validation(format!(
            "Id mismatch: path has {}, body has {}",
            path_id, payload_id
        )));
    }
    Ok(())
}

/// Length validators accept whitespace; names must carry text
pub(crate) fn ensure_not_blank(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Restrict-delete guard
pub(crate) fn ensure_unreferenced(count: i64, what: &str) -> AppResult<()> {
    if count > 0 {
        tracing::warn!("Delete refused: referenced by {} {}", count, what);
        return Err(AppError::Validation(format!(
            "cannot delete: referenced by {} {}",
            count, what
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use uuid::Uuid;

    use crate::models::account::{Role, UserClaims};

    pub fn caller(role: Role) -> UserClaims {
        UserClaims {
            sub: format!("{}@library.com", role.as_str().to_lowercase()),
            user_id: Uuid::new_v4(),
            role,
            exp: 0,
            iat: 0,
        }
    }

    pub fn admin() -> UserClaims {
        caller(Role::Admin)
    }

    pub fn user() -> UserClaims {
        caller(Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_write_depends_on_existence() {
        assert!(matches!(stale_write("Genre", 1, true), AppError::Conflict(_)));
        assert!(matches!(stale_write("Genre", 1, false), AppError::NotFound(_)));
    }

    #[test]
    fn restrict_message_carries_count() {
        match ensure_unreferenced(3, "books") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "cannot delete: referenced by 3 books"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(ensure_unreferenced(0, "books").is_ok());
    }

    #[test]
    fn id_mismatch_is_rejected() {
        assert!(ensure_same_id(4, 4).is_ok());
        assert!(matches!(ensure_same_id(4, 5), Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(ensure_not_blank("  ", "Name").is_err());
        assert!(ensure_not_blank("Poetry", "Name").is_ok());
    }
}
