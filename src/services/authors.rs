//! Author management service

use std::sync::Arc;

use validator::Validate;

use super::{ensure_not_blank, ensure_same_id, stale_write};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetails, CreateAuthor, UpdateAuthor},
        SearchQuery, UserClaims,
    },
    policy::{authorize, Action, Resource},
    repository::AuthorsStore,
};

#[derive(Clone)]
pub struct AuthorsService {
    store: Arc<dyn AuthorsStore>,
}

impl AuthorsService {
    pub fn new(store: Arc<dyn AuthorsStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        caller: &UserClaims,
        query: &SearchQuery,
    ) -> AppResult<(Vec<Author>, i64)> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        self.store.authors_search(query).await
    }

    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<AuthorDetails> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        let author = self
            .store
            .authors_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        let books = self.store.authors_books(id).await?;
        Ok(AuthorDetails::new(author, books))
    }

    pub async fn create(&self, caller: &UserClaims, data: CreateAuthor) -> AppResult<Author> {
        authorize(caller, Action::Create, Resource::Catalog)?;
        data.validate()?;
        ensure_not_blank(&data.first_name, "First name")?;
        ensure_not_blank(&data.last_name, "Last name")?;

        let author = self.store.authors_create(&data).await?;
        tracing::info!("Author {} created: {}", author.id, author.full_name());
        Ok(author)
    }

    pub async fn update(
        &self,
        caller: &UserClaims,
        id: i32,
        data: UpdateAuthor,
    ) -> AppResult<Author> {
        authorize(caller, Action::Update, Resource::Catalog)?;
        ensure_same_id(id, data.id)?;
        data.validate()?;
        ensure_not_blank(&data.first_name, "First name")?;
        ensure_not_blank(&data.last_name, "Last name")?;

        match self.store.authors_update(id, &data).await? {
            Some(author) => Ok(author),
            None => {
                let exists = self.store.authors_get_by_id(id).await?.is_some();
                Err(stale_write("Author", id, exists))
            }
        }
    }

    /// Unlinks the author from its books; the books themselves stay
    pub async fn delete(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        authorize(caller, Action::Delete, Resource::Catalog)?;
        if !self.store.authors_delete(id).await? {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        tracing::info!("Author {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::book::BookRef,
        repository::authors::MockAuthorsStore,
        services::test_support::{admin, user},
    };

    fn king() -> Author {
        Author {
            id: 3,
            first_name: "Stephen".to_string(),
            last_name: "King".to_string(),
            version: 1,
            book_count: 1,
        }
    }

    #[tokio::test]
    async fn detail_lists_linked_books() {
        let mut store = MockAuthorsStore::new();
        store.expect_authors_get_by_id().returning(|_| Ok(Some(king())));
        store.expect_authors_books().returning(|_| {
            Ok(vec![BookRef {
                id: 2,
                title: "Sample Book 2".to_string(),
                isbn: Some("0987654321".to_string()),
            }])
        });

        let details = AuthorsService::new(Arc::new(store))
            .get(&user(), 3)
            .await
            .unwrap();
        assert_eq!(details.full_name, "Stephen King");
        assert_eq!(details.books.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_unrestricted() {
        let mut store = MockAuthorsStore::new();
        store.expect_authors_delete().times(1).returning(|_| Ok(true));

        AuthorsService::new(Arc::new(store))
            .delete(&admin(), 3)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_of_unknown_author_is_not_found() {
        let mut store = MockAuthorsStore::new();
        store.expect_authors_delete().returning(|_| Ok(false));

        let err = AuthorsService::new(Arc::new(store))
            .delete(&admin(), 42)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn whitespace_names_never_reach_the_store() {
        let mut store = MockAuthorsStore::new();
        store.expect_authors_create().never();

        let data = CreateAuthor {
            first_name: "   ".to_string(),
            last_name: "King".to_string(),
        };
        let err = AuthorsService::new(Arc::new(store))
            .create(&admin(), data)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
