use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::reviews::models::ReviewPage;
use crate::utils::PageMeta;

/// Stored book record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier for the book
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(default)]
    pub description: String,
    /// Reference to a cover image, empty when unknown
    #[serde(default)]
    pub cover_image: String,
    /// Free-form publication date, empty when unknown
    #[serde(default)]
    pub published_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub published_date: Option<String>,
}

/// Validated partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub published_date: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl BookChanges {
    pub fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            author: None,
            genre: None,
            description: None,
            cover_image: None,
            published_date: None,
            updated_at,
        }
    }

    /// Slot for a client-facing (camelCase) field name.
    pub fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "title" => Some(&mut self.title),
            "author" => Some(&mut self.author),
            "genre" => Some(&mut self.genre),
            "description" => Some(&mut self.description),
            "coverImage" => Some(&mut self.cover_image),
            "publishedDate" => Some(&mut self.published_date),
            _ => None,
        }
    }

    /// Set fields keyed by their client-facing names.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("title", self.title.as_deref()),
            ("author", self.author.as_deref()),
            ("genre", self.genre.as_deref()),
            ("description", self.description.as_deref()),
            ("coverImage", self.cover_image.as_deref()),
            ("publishedDate", self.published_date.as_deref()),
        ]
    }
}

/// Raw `author` / `genre` query values; comma-separated values mean any-of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilters {
    pub author: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total_books: u64,
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// A book with its rating average and one page of reviews.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    pub book: Book,
    pub average_rating: f64,
    pub meta_reviews: ReviewPage,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookUpdated {
    pub message: &'static str,
    pub book: BookRef,
}
