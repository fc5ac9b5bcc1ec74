//! Book catalog service

use std::sync::Arc;

use validator::Validate;

use super::{ensure_not_blank, ensure_same_id, ensure_unreferenced, stale_write};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{normalize_author_ids, Book, BookQuery, CreateBook, UpdateBook},
        UserClaims,
    },
    policy::{authorize, Action, Resource},
    repository::{AuthorsStore, BooksStore, GenresStore, PublishersStore},
};

#[derive(Clone)]
pub struct BooksService {
    books: Arc<dyn BooksStore>,
    genres: Arc<dyn GenresStore>,
    publishers: Arc<dyn PublishersStore>,
    authors: Arc<dyn AuthorsStore>,
}

impl BooksService {
    pub fn new(
        books: Arc<dyn BooksStore>,
        genres: Arc<dyn GenresStore>,
        publishers: Arc<dyn PublishersStore>,
        authors: Arc<dyn AuthorsStore>,
    ) -> Self {
        Self {
            books,
            genres,
            publishers,
            authors,
        }
    }

    pub async fn list(&self, caller: &UserClaims, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        self.books.books_search(query).await
    }

    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<Book> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        self.books
            .books_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn create(&self, caller: &UserClaims, mut data: CreateBook) -> AppResult<Book> {
        authorize(caller, Action::Create, Resource::Catalog)?;
        data.validate()?;
        ensure_not_blank(&data.title, "Title")?;

        data.author_ids = normalize_author_ids(&data.author_ids);
        self.check_references(data.genre_id, data.publisher_id, &data.author_ids)
            .await?;

        let book = self.books.books_create(&data).await?;
        tracing::info!("Book {} created: {}", book.id, book.title);
        Ok(book)
    }

    /// Full overwrite; the author set becomes exactly `author_ids`
    pub async fn update(&self, caller: &UserClaims, id: i32, mut data: UpdateBook) -> AppResult<Book> {
        authorize(caller, Action::Update, Resource::Catalog)?;
        ensure_same_id(id, data.id)?;
        data.validate()?;
        ensure_not_blank(&data.title, "Title")?;

        data.author_ids = normalize_author_ids(&data.author_ids);
        self.check_references(data.genre_id, data.publisher_id, &data.author_ids)
            .await?;

        match self.books.books_update(id, &data).await? {
            Some(book) => Ok(book),
            None => {
                let exists = self.books.books_get_by_id(id).await?.is_some();
                Err(stale_write("Book", id, exists))
            }
        }
    }

    /// Refused while borrowing records point at the book
    pub async fn delete(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        authorize(caller, Action::Delete, Resource::Catalog)?;
        if self.books.books_get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let borrowings = self.books.books_count_borrowings(id).await?;
        ensure_unreferenced(borrowings, "borrowings")?;

        if !self.books.books_delete(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    async fn check_references(
        &self,
        genre_id: i32,
        publisher_id: i32,
        author_ids: &[i32],
    ) -> AppResult<()> {
        if self.genres.genres_get_by_id(genre_id).await?.is_none() {
            return Err(AppError::Validation(format!("Genre {} does not exist", genre_id)));
        }
        if self.publishers.publishers_get_by_id(publisher_id).await?.is_none() {
            return Err(AppError::Validation(format!(
                "Publisher {} does not exist",
                publisher_id
            )));
        }

        let missing = self.authors.authors_missing(author_ids).await?;
        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
            return Err(AppError::Validation(format!(
                "Unknown author ids: {}",
                ids.join(", ")
            )));
        }
        Ok(())
    }
}
