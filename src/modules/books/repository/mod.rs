//! Book persistence, one implementation per storage backend.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use shelf_db::{DbError, Store};
use shelf_kernel::Migration;

use super::models::{Book, BookChanges};
use super::query::BookQuery;

pub use memory::MemoryBookRepository;
pub use sqlite::SqlBookRepository;

pub const COLLECTION: &str = "books";

pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "0001_create_books",
        up: include_str!("../migrations/0001_create_books.sql"),
    }]
}

/// Persistence for book records.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: &Book) -> Result<(), DbError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Book>, DbError>;

    /// Matching books in insertion order, windowed by `skip` and `limit`.
    async fn find(&self, query: &BookQuery, skip: u64, limit: u64) -> Result<Vec<Book>, DbError>;

    async fn count(&self, query: &BookQuery) -> Result<u64, DbError>;

    /// Apply the changes and return the updated book.
    async fn update(&self, id: &str, changes: &BookChanges) -> Result<Option<Book>, DbError>;
}

pub fn for_store(store: &Store) -> Arc<dyn BookRepository> {
    match store {
        Store::Memory(db) => Arc::new(MemoryBookRepository::new(db)),
        Store::Sql(sql) => Arc::new(SqlBookRepository::new(sql)),
    }
}
