use async_trait::async_trait;

use shelf_db::{from_document, to_document, Collection, Database, DbError, Filter};

use super::{CredentialStore, COLLECTION};
use crate::modules::users::models::User;

pub struct MemoryCredentialStore {
    users: Collection,
}

impl MemoryCredentialStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, user: &User) -> Result<(), DbError> {
        self.users.insert_one(to_document(user)?).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        self.users
            .find_one(&Filter::eq("email", email))
            .await?
            .map(from_document)
            .transpose()
    }
}
