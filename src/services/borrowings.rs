//! Borrowing workflow service

use std::sync::Arc;

use chrono::Utc;

use super::{ensure_same_id, stale_write};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{
            Borrowing, BorrowingQuery, BorrowingStatus, CreateBorrowing, NewBorrowing,
            UpdateBorrowing,
        },
        UserClaims,
    },
    policy::{authorize, Action, Resource},
    repository::{AccountsStore, BooksStore, BorrowingsStore},
};

#[derive(Clone)]
pub struct BorrowingsService {
    borrowings: Arc<dyn BorrowingsStore>,
    books: Arc<dyn BooksStore>,
    accounts: Arc<dyn AccountsStore>,
}

impl BorrowingsService {
    pub fn new(
        borrowings: Arc<dyn BorrowingsStore>,
        books: Arc<dyn BooksStore>,
        accounts: Arc<dyn AccountsStore>,
    ) -> Self {
        Self {
            borrowings,
            books,
            accounts,
        }
    }

    /// Users only ever see their own rows; admins may filter by user
    pub async fn list(
        &self,
        caller: &UserClaims,
        query: &BorrowingQuery,
    ) -> AppResult<(Vec<Borrowing>, i64)> {
        let mut query = query.clone();
        if !caller.is_admin() {
            query.user_id = Some(caller.user_id);
        }
        if let Some(owner_id) = query.user_id {
            authorize(caller, Action::Read, Resource::Borrowing { owner_id })?;
        }
        self.borrowings.borrowings_search(&query).await
    }

    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<Borrowing> {
        let borrowing = self.find(id).await?;
        authorize(
            caller,
            Action::Read,
            Resource::Borrowing { owner_id: borrowing.user_id },
        )?;
        Ok(borrowing)
    }

    /// New request, always Pending and dated now
    pub async fn create(&self, caller: &UserClaims, data: CreateBorrowing) -> AppResult<Borrowing> {
        let owner_id = data.user_id.unwrap_or(caller.user_id);
        authorize(caller, Action::Create, Resource::Borrowing { owner_id })?;

        if owner_id != caller.user_id && self.accounts.accounts_get_by_id(owner_id).await?.is_none() {
            return Err(AppError::Validation(format!("Account {} does not exist", owner_id)));
        }
        self.ensure_book(data.book_id).await?;

        let borrowing = self
            .borrowings
            .borrowings_create(&NewBorrowing::pending(data.book_id, owner_id))
            .await?;
        tracing::info!(
            "Borrowing {} requested: book {} for {}",
            borrowing.id,
            borrowing.book_id,
            borrowing.user_email
        );
        Ok(borrowing)
    }

    /// Admin edit; only the fields present in `data` change
    pub async fn update(
        &self,
        caller: &UserClaims,
        id: i32,
        data: UpdateBorrowing,
    ) -> AppResult<Borrowing> {
        let current = self.find(id).await?;
        authorize(
            caller,
            Action::Update,
            Resource::Borrowing { owner_id: current.user_id },
        )?;
        ensure_same_id(id, data.id)?;

        if let Some(book_id) = data.book_id {
            self.ensure_book(book_id).await?;
        }
        if let Some(user_id) = data.user_id {
            if self.accounts.accounts_get_by_id(user_id).await?.is_none() {
                return Err(AppError::Validation(format!("Account {} does not exist", user_id)));
            }
        }

        match self.borrowings.borrowings_update(id, &data).await? {
            Some(borrowing) => Ok(borrowing),
            None => self.stale(id).await,
        }
    }

    /// Pending -> Active
    pub async fn approve(&self, caller: &UserClaims, id: i32) -> AppResult<Borrowing> {
        self.advance(caller, id, BorrowingStatus::Active).await
    }

    /// Active -> Returned, stamping the return date
    pub async fn return_book(&self, caller: &UserClaims, id: i32) -> AppResult<Borrowing> {
        self.advance(caller, id, BorrowingStatus::Returned).await
    }

    pub async fn delete(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        let borrowing = self.find(id).await?;
        authorize(
            caller,
            Action::Delete,
            Resource::Borrowing { owner_id: borrowing.user_id },
        )?;

        if !self.borrowings.borrowings_delete(id).await? {
            return Err(AppError::NotFound(format!("Borrowing with id {} not found", id)));
        }
        tracing::info!("Borrowing {} deleted", id);
        Ok(())
    }

    async fn advance(
        &self,
        caller: &UserClaims,
        id: i32,
        next: BorrowingStatus,
    ) -> AppResult<Borrowing> {
        let current = self.find(id).await?;
        authorize(
            caller,
            Action::Update,
            Resource::Borrowing { owner_id: current.user_id },
        )?;

        let status = current.status.transition(next)?;
        let return_date = match status {
            BorrowingStatus::Returned => Some(Utc::now()),
            _ => current.return_date,
        };

        match self
            .borrowings
            .borrowings_set_status(id, current.version, status, return_date)
            .await?
        {
            Some(borrowing) => {
                tracing::info!("Borrowing {} is now {}", id, borrowing.status);
                Ok(borrowing)
            }
            None => self.stale(id).await,
        }
    }

    async fn find(&self, id: i32) -> AppResult<Borrowing> {
        self.borrowings
            .borrowings_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    async fn ensure_book(&self, book_id: i32) -> AppResult<()> {
        if self.books.books_get_by_id(book_id).await?.is_none() {
            return Err(AppError::Validation(format!("Book {} does not exist", book_id)));
        }
        Ok(())
    }

    async fn stale(&self, id: i32) -> AppResult<Borrowing> {
        let exists = self.borrowings.borrowings_get_by_id(id).await?.is_some();
        Err(stale_write("Borrowing", id, exists))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};
    use uuid::Uuid;

    use super::*;
    use crate::{
        models::{Account, Book, Role},
        repository::{
            accounts::MockAccountsStore, books::MockBooksStore, borrowings::MockBorrowingsStore,
        },
        services::test_support::{admin, user},
    };

    struct Mocks {
        borrowings: MockBorrowingsStore,
        books: MockBooksStore,
        accounts: MockAccountsStore,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                borrowings: MockBorrowingsStore::new(),
                books: MockBooksStore::new(),
                accounts: MockAccountsStore::new(),
            }
        }

        /// Book 1 exists, nothing else does
        fn with_book(mut self) -> Self {
            self.books.expect_books_get_by_id().returning(|id| {
                Ok((id == 1).then(|| Book {
                    id,
                    title: "Sample Book 1".to_string(),
                    isbn: None,
                    genre_id: 1,
                    genre_name: "Fiction".to_string(),
                    publisher_id: 1,
                    publisher_name: "Penguin Books".to_string(),
                    published_date: None,
                    description: None,
                    version: 1,
                    authors: vec![],
                }))
            });
            self
        }

        fn service(self) -> BorrowingsService {
            BorrowingsService::new(
                Arc::new(self.borrowings),
                Arc::new(self.books),
                Arc::new(self.accounts),
            )
        }
    }

    fn long_ago() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(id: i32, user_id: Uuid, status: BorrowingStatus) -> Borrowing {
        Borrowing {
            id,
            book_id: 1,
            book_title: "Sample Book 1".to_string(),
            user_id,
            user_email: "reader@library.com".to_string(),
            borrow_date: long_ago(),
            return_date: None,
            status,
            version: 1,
        }
    }

    fn stored(data: &NewBorrowing) -> Borrowing {
        Borrowing {
            id: 5,
            book_id: data.book_id,
            book_title: "Sample Book 1".to_string(),
            user_id: data.user_id,
            user_email: "reader@library.com".to_string(),
            borrow_date: data.borrow_date,
            return_date: None,
            status: data.status,
            version: 1,
        }
    }

    #[tokio::test]
    async fn creation_is_pending_and_dated_now() {
        let caller = user();
        let caller_id = caller.user_id;
        let mut mocks = Mocks::new().with_book();
        mocks
            .borrowings
            .expect_borrowings_create()
            .withf(move |data| data.user_id == caller_id && data.status == BorrowingStatus::Pending)
            .returning(|data| Ok(stored(data)));

        // Client-supplied status and dates are not even part of the request type
        let request: CreateBorrowing = serde_json::from_str(
            r#"{"book_id":1,"status":"Returned","borrow_date":"2001-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let before = Utc::now();
        let borrowing = mocks.service().create(&caller, request).await.unwrap();
        assert_eq!(borrowing.status, BorrowingStatus::Pending);
        assert!(borrowing.borrow_date >= before);
        assert!(borrowing.return_date.is_none());
    }

    #[tokio::test]
    async fn creation_for_unknown_book_fails() {
        let mut mocks = Mocks::new().with_book();
        mocks.borrowings.expect_borrowings_create().never();

        let request = CreateBorrowing { book_id: 99, user_id: None };
        let err = mocks.service().create(&user(), request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn users_cannot_borrow_for_someone_else() {
        let mocks = Mocks::new().with_book();
        let request = CreateBorrowing { book_id: 1, user_id: Some(Uuid::new_v4()) };
        let err = mocks.service().create(&user(), request).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_borrowing_for_unknown_account_fails() {
        let mut mocks = Mocks::new().with_book();
        mocks.accounts.expect_accounts_get_by_id().returning(|_| Ok(None));
        mocks.borrowings.expect_borrowings_create().never();

        let request = CreateBorrowing { book_id: 1, user_id: Some(Uuid::new_v4()) };
        let err = mocks.service().create(&admin(), request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn admin_may_borrow_on_behalf_of_an_account() {
        let reader = Uuid::new_v4();
        let mut mocks = Mocks::new().with_book();
        mocks.accounts.expect_accounts_get_by_id().returning(|id| {
            Ok(Some(Account {
                id,
                email: "reader@library.com".to_string(),
                password_hash: String::new(),
                role: Role::User,
                created_at: Utc::now(),
            }))
        });
        mocks
            .borrowings
            .expect_borrowings_create()
            .withf(move |data| data.user_id == reader)
            .returning(|data| Ok(stored(data)));

        let request = CreateBorrowing { book_id: 1, user_id: Some(reader) };
        let borrowing = mocks.service().create(&admin(), request).await.unwrap();
        assert_eq!(borrowing.user_id, reader);
    }

    #[tokio::test]
    async fn user_listing_is_restricted_to_own_rows() {
        let caller = user();
        let caller_id = caller.user_id;
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_search()
            .withf(move |query| query.user_id == Some(caller_id))
            .returning(move |_| Ok((vec![record(1, caller_id, BorrowingStatus::Pending)], 1)));

        // Asking for someone else's rows is silently narrowed
        let query = BorrowingQuery {
            user_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let (rows, total) = mocks.service().list(&caller, &query).await.unwrap();
        assert_eq!(total, 1);
        assert!(rows.iter().all(|b| b.user_id == caller_id));
    }

    #[tokio::test]
    async fn admin_listing_is_unfiltered() {
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_search()
            .withf(|query| query.user_id.is_none())
            .returning(|_| {
                Ok((
                    vec![
                        record(1, Uuid::new_v4(), BorrowingStatus::Pending),
                        record(2, Uuid::new_v4(), BorrowingStatus::Active),
                    ],
                    2,
                ))
            });

        let (rows, _) = mocks
            .service()
            .list(&admin(), &BorrowingQuery::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn foreign_borrowing_is_forbidden() {
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(|id| Ok(Some(record(id, Uuid::new_v4(), BorrowingStatus::Active))));

        let err = mocks.service().get(&user(), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn approve_only_from_pending() {
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(|id| Ok(Some(record(id, Uuid::new_v4(), BorrowingStatus::Active))));
        mocks.borrowings.expect_borrowings_set_status().never();

        let err = mocks.service().approve(&admin(), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn approve_activates_a_pending_request() {
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(|id| Ok(Some(record(id, Uuid::new_v4(), BorrowingStatus::Pending))));
        mocks
            .borrowings
            .expect_borrowings_set_status()
            .withf(|_, version, status, return_date| {
                *version == 1 && *status == BorrowingStatus::Active && return_date.is_none()
            })
            .returning(|id, _, status, return_date| {
                let mut row = record(id, Uuid::nil(), status);
                row.return_date = return_date;
                row.version = 2;
                Ok(Some(row))
            });

        let row = mocks.service().approve(&admin(), 1).await.unwrap();
        assert_eq!(row.status, BorrowingStatus::Active);
    }

    #[tokio::test]
    async fn return_only_from_active_and_stamps_date() {
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(|id| {
                let status = if id == 1 { BorrowingStatus::Pending } else { BorrowingStatus::Active };
                Ok(Some(record(id, Uuid::new_v4(), status)))
            });
        mocks
            .borrowings
            .expect_borrowings_set_status()
            .withf(|id, _, status, return_date| {
                *id == 2 && *status == BorrowingStatus::Returned && return_date.is_some()
            })
            .returning(|id, _, status, return_date| {
                let mut row = record(id, Uuid::nil(), status);
                row.return_date = return_date;
                Ok(Some(row))
            });
        let service = mocks.service();

        let err = service.return_book(&admin(), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let row = service.return_book(&admin(), 2).await.unwrap();
        assert_eq!(row.status, BorrowingStatus::Returned);
        assert!(row.return_date.is_some());
    }

    #[tokio::test]
    async fn users_cannot_approve_their_own_request() {
        let caller = user();
        let caller_id = caller.user_id;
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(move |id| Ok(Some(record(id, caller_id, BorrowingStatus::Pending))));

        let err = mocks.service().approve(&caller, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn owner_may_delete_own_borrowing() {
        let caller = user();
        let caller_id = caller.user_id;
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(move |id| Ok(Some(record(id, caller_id, BorrowingStatus::Returned))));
        mocks.borrowings.expect_borrowings_delete().times(1).returning(|_| Ok(true));

        mocks.service().delete(&caller, 1).await.unwrap();
    }

    #[tokio::test]
    async fn stale_update_of_vanished_row_is_not_found() {
        let mut mocks = Mocks::new();
        let mut calls = 0;
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(move |id| {
                calls += 1;
                // Present for the initial lookup, gone by the re-check
                Ok((calls == 1).then(|| record(id, Uuid::nil(), BorrowingStatus::Pending)))
            });
        mocks.borrowings.expect_borrowings_update().returning(|_, _| Ok(None));

        let data = UpdateBorrowing {
            id: 1,
            version: 1,
            status: Some(BorrowingStatus::Active),
            ..Default::default()
        };
        let err = mocks.service().update(&admin(), 1, data).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn stale_update_of_existing_row_conflicts() {
        let mut mocks = Mocks::new();
        mocks
            .borrowings
            .expect_borrowings_get_by_id()
            .returning(|id| Ok(Some(record(id, Uuid::nil(), BorrowingStatus::Pending))));
        mocks.borrowings.expect_borrowings_update().returning(|_, _| Ok(None));

        let data = UpdateBorrowing {
            id: 1,
            version: 1,
            ..Default::default()
        };
        let err = mocks.service().update(&admin(), 1, data).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
