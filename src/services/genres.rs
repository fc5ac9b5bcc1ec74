//! Genre management service

use std::sync::Arc;

use validator::Validate;

use super::{ensure_not_blank, ensure_same_id, ensure_unreferenced, stale_write};
use crate::{
    error::{AppError, AppResult},
    models::{
        genre::{CreateGenre, Genre, GenreDetails, UpdateGenre},
        SearchQuery, UserClaims,
    },
    policy::{authorize, Action, Resource},
    repository::GenresStore,
};

#[derive(Clone)]
pub struct GenresService {
    store: Arc<dyn GenresStore>,
}

impl GenresService {
    pub fn new(store: Arc<dyn GenresStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        caller: &UserClaims,
        query: &SearchQuery,
    ) -> AppResult<(Vec<Genre>, i64)> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        self.store.genres_search(query).await
    }

    /// Genre with the books filed under it
    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<GenreDetails> {
        authorize(caller, Action::Read, Resource::Catalog)?;
        let genre = self.find(id).await?;
        let books = self.store.genres_books(id).await?;
        Ok(GenreDetails {
            id: genre.id,
            name: genre.name,
            version: genre.version,
            books,
        })
    }

    pub async fn create(&self, caller: &UserClaims, data: CreateGenre) -> AppResult<Genre> {
        authorize(caller, Action::Create, Resource::Catalog)?;
        data.validate()?;
        ensure_not_blank(&data.name, "Name")?;

        if self.store.genres_name_exists(data.name.trim(), None).await? {
            return Err(AppError::Validation(format!(
                "Genre '{}' already exists",
                data.name.trim()
            )));
        }

        let genre = self.store.genres_create(&data).await?;
        tracing::info!("Genre {} created: {}", genre.id, genre.name);
        Ok(genre)
    }

    pub async fn update(&self, caller: &UserClaims, id: i32, data: UpdateGenre) -> AppResult<Genre> {
        authorize(caller, Action::Update, Resource::Catalog)?;
        ensure_same_id(id, data.id)?;
        data.validate()?;
        ensure_not_blank(&data.name, "Name")?;

        if self.store.genres_name_exists(data.name.trim(), Some(id)).await? {
            return Err(AppError::Validation(format!(
                "Genre '{}' already exists",
                data.name.trim()
            )));
        }

        match self.store.genres_update(id, &data).await? {
            Some(genre) => Ok(genre),
            None => {
                let exists = self.store.genres_get_by_id(id).await?.is_some();
                Err(stale_write("Genre", id, exists))
            }
        }
    }

    /// Refused while any book is filed under the genre
    pub async fn delete(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        authorize(caller, Action::Delete, Resource::Catalog)?;
        self.find(id).await?;

        let books = self.store.genres_count_books(id).await?;
        ensure_unreferenced(books, "books")?;

        if !self.store.genres_delete(id).await? {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        tracing::info!("Genre {} deleted", id);
        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<Genre> {
        self.store
            .genres_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }
}
