//! Publisher management service

use std::sync::Arc;

use validator::Validate;

use super::{ensure_not_blank, ensure_same_id, ensure_unreferenced, stale_write};
use crate::{
    error::{AppError, AppResult},
    models::{
        publisher::{CreatePublisher, Publisher, PublisherDetails, UpdatePublisher},
        SearchQuery, UserClaims,
    },
    policy::{authorize, Action, Resource},
    repository::PublishersStore,
};

#[derive(Clone)]
pub struct PublishersService {
    store: Arc<dyn PublishersStore>,
}

impl PublishersService {
    pub fn new(store: Arc<dyn PublishersStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        caller: &UserClaims,
        query: &SearchQuery,
    ) -> AppResult<(Vec<Publisher>, i64)> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        self.store.publishers_search(query).await
    }

    /// Publisher with its published books
    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<PublisherDetails> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        let publisher = self.find(id).await?;
        let books = self.store.publishers_books(id).await?;
        Ok(PublisherDetails {
            id: publisher.id,
            name: publisher.name,
            version: publisher.version,
            books,
        })
    }

    pub async fn create(&self, caller: &UserClaims, data: CreatePublisher) -> AppResult<Publisher> {
        authorize(caller, Action::Create, Resource::Catalog)?;
        data.validate()?;
        ensure_not_blank(&data.name, "Name")?;

        if self.store.publishers_name_exists(data.name.trim(), None).await? {
            return Err(AppError::Validation(format!(
                "Publisher '{}' already exists",
                data.name.trim()
            )));
        }

        let publisher = self.store.publishers_create(&data).await?;
        tracing::info!("Publisher {} created: {}", publisher.id, publisher.name);
        Ok(publisher)
    }

    pub async fn update(&self, caller: &UserClaims, id: i32, data: UpdatePublisher) -> AppResult<Publisher> {
        authorize(caller, Action::Update, Resource::Catalog)?;
        ensure_same_id(id, data.id)?;
        data.validate()?;
        ensure_not_blank(&data.name, "Name")?;

        if self.store.publishers_name_exists(data.name.trim(), Some(id)).await? {
            return Err(AppError::Validation(format!(
                "Publisher '{}' already exists",
                data.name.trim()
            )));
        }

        match self.store.publishers_update(id, &data).await? {
            Some(publisher) => Ok(publisher),
            None => {
                let exists = self.store.publishers_get_by_id(id).await?.is_some();
                Err(stale_write("Publisher", id, exists))
            }
        }
    }

    /// Refused while the publisher still has books
    pub async fn delete(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        authorize(caller, Action::Delete, Resource::Catalog)?;
        self.find(id).await?;

        let books = self.store.publishers_count_books(id).await?;
        ensure_unreferenced(books, "books")?;

        if !self.store.publishers_delete(id).await? {
            return Err(AppError::NotFound(format!("Publisher with id {} not found", id)));
        }
        tracing::info!("Publisher {} deleted", id);
        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<Publisher> {
        self.store
            .publishers_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        repository::publishers::MockPublishersStore,
        services::test_support::{admin, user},
    };

    fn penguin(version: i32) -> Publisher {
        Publisher {
            id: 1,
            name: "Penguin Books".to_string(),
            version,
            book_count: 0,
        }
    }

    fn service(store: MockPublishersStore) -> PublishersService {
        PublishersService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn delete_is_refused_while_books_reference_the_publisher() {
        let mut store = MockPublishersStore::new();
        store
            .expect_publishers_get_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(penguin(1))));
        store.expect_publishers_count_books().returning(|_| Ok(2));
        store.expect_publishers_delete().never();

        let err = service(store).delete(&admin(), 1).await.unwrap_err();
        match err {
            AppError::Validation(msg) => assert_eq!(msg, "cannot delete: referenced by 2 books"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_succeeds_without_references() {
        let mut store = MockPublishersStore::new();
        store
            .expect_publishers_get_by_id()
            .returning(|_| Ok(Some(penguin(1))));
        store.expect_publishers_count_books().returning(|_| Ok(0));
        store.expect_publishers_delete().times(1).returning(|_| Ok(true));

        service(store).delete(&admin(), 1).await.unwrap();
    }

    #[tokio::test]
    async fn delete_of_unknown_publisher_is_not_found() {
        let mut store = MockPublishersStore::new();
        store.expect_publishers_get_by_id().returning(|_| Ok(None));

        let err = service(store).delete(&admin(), 9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_name_is_a_validation_failure() {
        let mut store = MockPublishersStore::new();
        store.expect_publishers_name_exists().returning(|_, _| Ok(true));
        store.expect_publishers_create().never();

        let err = service(store)
            .create(&admin(), CreatePublisher { name: "Penguin Books".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn users_cannot_create_publishers() {
        let store = MockPublishersStore::new();
        let err = service(store)
            .create(&user(), CreatePublisher { name: "Tor".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn stale_update_on_existing_row_conflicts() {
        let mut store = MockPublishersStore::new();
        store.expect_publishers_name_exists().returning(|_, _| Ok(false));
        store.expect_publishers_update().returning(|_, _| Ok(None));
        store
            .expect_publishers_get_by_id()
            .returning(|_| Ok(Some(penguin(3))));

        let data = UpdatePublisher { id: 1, version: 1, name: "Penguin Classics".to_string() };
        let err = service(store).update(&admin(), 1, data).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn stale_update_on_vanished_row_is_not_found() {
        let mut store = MockPublishersStore::new();
        store.expect_publishers_name_exists().returning(|_, _| Ok(false));
        store.expect_publishers_update().returning(|_, _| Ok(None));
        store.expect_publishers_get_by_id().returning(|_| Ok(None));

        let data = UpdatePublisher { id: 1, version: 1, name: "Penguin Classics".to_string() };
        let err = service(store).update(&admin(), 1, data).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_rejects_mismatched_ids() {
        let store = MockPublishersStore::new();
        let data = UpdatePublisher { id: 2, version: 1, name: "Penguin Classics".to_string() };
        let err = service(store).update(&admin(), 1, data).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
