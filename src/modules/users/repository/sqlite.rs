use async_trait::async_trait;
use sqlx::SqlitePool;

use shelf_db::{DbError, SqlStore};

use super::{CredentialStore, COLLECTION, EMAIL_INDEX};
use crate::modules::users::models::User;

pub struct SqlCredentialStore {
    pool: SqlitePool,
}

impl SqlCredentialStore {
    pub fn new(store: &SqlStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    async fn insert(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| DbError::from_sql(err, COLLECTION, EMAIL_INDEX.name))?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
