//! Startup seeding: administrator account and a small sample catalog

use chrono::{Months, NaiveDate, Utc};

use super::auth::AuthService;
use crate::{
    config::SeedConfig,
    error::AppResult,
    models::{
        author::CreateAuthor, book::CreateBook, genre::CreateGenre, publisher::CreatePublisher,
    },
    repository::{AuthorsStore, BooksStore, GenresStore, PublishersStore, Repository},
};

const SAMPLE_GENRES: [&str; 6] = [
    "Fiction",
    "Non-Fiction",
    "Science Fiction",
    "Mystery",
    "Romance",
    "Fantasy",
];

const SAMPLE_PUBLISHERS: [&str; 4] = [
    "Penguin Books",
    "HarperCollins",
    "Random House",
    "Simon & Schuster",
];

const SAMPLE_AUTHORS: [(&str, &str); 4] = [
    ("J.K.", "Rowling"),
    ("George R.R.", "Martin"),
    ("Stephen", "King"),
    ("Agatha", "Christie"),
];

/// Sample book; genre, publisher and authors index the lists above
struct SampleBook {
    title: &'static str,
    isbn: &'static str,
    description: &'static str,
    genre: usize,
    publisher: usize,
    authors: &'static [usize],
    months_ago: u32,
}

const SAMPLE_BOOKS: [SampleBook; 2] = [
    SampleBook {
        title: "Sample Book 1",
        isbn: "1234567890",
        description: "A sample book for testing",
        genre: 0,
        publisher: 0,
        authors: &[0, 1],
        months_ago: 12,
    },
    SampleBook {
        title: "Sample Book 2",
        isbn: "0987654321",
        description: "Another sample book for testing",
        genre: 1,
        publisher: 1,
        authors: &[2],
        months_ago: 6,
    },
];

fn months_before_today(months: u32) -> Option<NaiveDate> {
    Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(months))
}

/// Ensure the admin account exists, then fill an empty catalog when enabled
pub async fn run(repository: &Repository, auth: &AuthService, config: &SeedConfig) -> AppResult<()> {
    auth.ensure_admin(&config.admin_email, &config.admin_password).await?;

    if !config.sample_data {
        return Ok(());
    }
    if !repository.catalog_is_empty().await? {
        tracing::debug!("Catalog already populated, skipping sample data");
        return Ok(());
    }

    let mut genre_ids = Vec::with_capacity(SAMPLE_GENRES.len());
    for name in SAMPLE_GENRES {
        let genre = repository
            .genres_create(&CreateGenre { name: name.to_string() })
            .await?;
        genre_ids.push(genre.id);
    }

    let mut publisher_ids = Vec::with_capacity(SAMPLE_PUBLISHERS.len());
    for name in SAMPLE_PUBLISHERS {
        let publisher = repository
            .publishers_create(&CreatePublisher { name: name.to_string() })
            .await?;
        publisher_ids.push(publisher.id);
    }

    let mut author_ids = Vec::with_capacity(SAMPLE_AUTHORS.len());
    for (first_name, last_name) in SAMPLE_AUTHORS {
        let author = repository
            .authors_create(&CreateAuthor {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
            .await?;
        author_ids.push(author.id);
    }

    for sample in &SAMPLE_BOOKS {
        repository
            .books_create(&CreateBook {
                title: sample.title.to_string(),
                isbn: Some(sample.isbn.to_string()),
                genre_id: genre_ids[sample.genre],
                publisher_id: publisher_ids[sample.publisher],
                published_date: months_before_today(sample.months_ago),
                description: Some(sample.description.to_string()),
                author_ids: sample.authors.iter().map(|&i| author_ids[i]).collect(),
            })
            .await?;
    }

    tracing::info!(
        "Sample catalog seeded: {} genres, {} publishers, {} authors, {} books",
        genre_ids.len(),
        publisher_ids.len(),
        author_ids.len(),
        SAMPLE_BOOKS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_books_point_at_existing_samples() {
        for book in &SAMPLE_BOOKS {
            assert!(book.genre < SAMPLE_GENRES.len());
            assert!(book.publisher < SAMPLE_PUBLISHERS.len());
            assert!(book.authors.iter().all(|&a| a < SAMPLE_AUTHORS.len()));
        }
    }

    #[test]
    fn published_dates_are_in_the_past() {
        let today = Utc::now().date_naive();
        assert!(months_before_today(6).unwrap() < today);
        assert!(months_before_today(12).unwrap() < months_before_today(6).unwrap());
    }
}
