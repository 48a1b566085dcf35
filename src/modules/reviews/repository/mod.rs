//! Review persistence, one implementation per storage backend.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use shelf_db::{DbError, IndexSpec, Store};
use shelf_kernel::Migration;

use super::models::{RatingSummary, Review, ReviewChanges};

pub use memory::MemoryReviewRepository;
pub use sqlite::SqlReviewRepository;

pub const COLLECTION: &str = "reviews";

/// One review per user per book.
pub const OWNER_INDEX: IndexSpec = IndexSpec {
    collection: COLLECTION,
    name: "reviews_book_user_unique",
    fields: &["bookId", "userId"],
    unique: true,
};

pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "0001_create_reviews",
        up: include_str!("../migrations/0001_create_reviews.sql"),
    }]
}

/// Persistence for reviews. `insert` fails with [`DbError::DuplicateKey`]
/// when the (book, user) pair already has a review.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: &Review) -> Result<(), DbError>;

    async fn find_by_owner(&self, book_id: &str, user_id: &str)
        -> Result<Option<Review>, DbError>;

    /// Reviews of a book, newest first, windowed by `skip` and `limit`.
    async fn latest_for_book(
        &self,
        book_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Review>, DbError>;

    async fn rating_summary(&self, book_id: &str) -> Result<RatingSummary, DbError>;

    async fn update_owned(
        &self,
        book_id: &str,
        user_id: &str,
        changes: ReviewChanges,
    ) -> Result<Option<Review>, DbError>;

    async fn delete_owned(&self, book_id: &str, user_id: &str)
        -> Result<Option<Review>, DbError>;
}

pub fn for_store(store: &Store) -> Arc<dyn ReviewRepository> {
    match store {
        Store::Memory(db) => Arc::new(MemoryReviewRepository::new(db)),
        Store::Sql(sql) => Arc::new(SqlReviewRepository::new(sql)),
    }
}
