//! SQLite backend.
//!
//! Schema comes from module migrations, recorded in `_shelf_migrations` so
//! each one runs exactly once per database file.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::DbError;

/// Endpoint prefix accepted by [`SqlStore::connect`], e.g. `sqlite://shelf.db`
/// or `sqlite::memory:`.
pub const SQLITE_SCHEME: &str = "sqlite:";

const MAX_CONNECTIONS: u32 = 8;

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS _shelf_migrations (
    module TEXT NOT NULL,
    id TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (module, id)
)";

/// Pooled SQLite connection. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Open (creating if needed) the database named by `endpoint`.
    pub async fn connect(endpoint: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(endpoint)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database, so keep one alive.
        let pool_options = if endpoint.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::query(MIGRATIONS_TABLE).execute(&pool).await?;

        tracing::info!(target: "shelf-db", endpoint, "sqlite database opened");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `up` unless `(module, id)` was applied before. Returns whether it ran.
    pub async fn apply_migration(&self, module: &str, id: &str, up: &str) -> Result<bool, DbError> {
        let wrap = |source| DbError::Migration {
            module: module.to_string(),
            id: id.to_string(),
            source,
        };

        let mut tx = self.pool.begin().await?;

        let applied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _shelf_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if applied > 0 {
            return Ok(false);
        }

        sqlx::raw_sql(up).execute(&mut *tx).await.map_err(wrap)?;
        sqlx::query("INSERT INTO _shelf_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "shelf-db", module, migration = id, "migration applied");
        Ok(true)
    }

    /// Whether an index with this name exists in the schema.
    pub async fn has_index(&self, name: &str) -> Result<bool, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
