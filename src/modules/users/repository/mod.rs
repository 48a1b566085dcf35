//! Account persistence, one implementation per storage backend.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use shelf_db::{DbError, IndexSpec, Store};
use shelf_kernel::Migration;

use super::models::User;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqlCredentialStore;

pub const COLLECTION: &str = "users";

pub const EMAIL_INDEX: IndexSpec = IndexSpec {
    collection: COLLECTION,
    name: "users_email_unique",
    fields: &["email"],
    unique: true,
};

/// Persistence for user accounts. `insert` fails with
/// [`DbError::DuplicateKey`] when the email is already registered.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), DbError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
}

pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "0001_create_users",
        up: include_str!("../migrations/0001_create_users.sql"),
    }]
}

pub fn for_store(store: &Store) -> Arc<dyn CredentialStore> {
    match store {
        Store::Memory(db) => Arc::new(MemoryCredentialStore::new(db)),
        Store::Sql(sql) => Arc::new(SqlCredentialStore::new(sql)),
    }
}
