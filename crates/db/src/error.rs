use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("duplicate key for index '{index}' on collection '{collection}'")]
    DuplicateKey { collection: String, index: String },

    #[error("unsupported database endpoint '{0}'; expected memory:// or sqlite:")]
    UnsupportedEndpoint(String),

    #[error("value does not serialize to a document")]
    NotADocument,

    #[error("invalid match pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("stored value for '{field}' is out of range")]
    Corrupt { field: &'static str },
}

impl DbError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DbError::DuplicateKey { .. })
    }

    /// Map a unique-constraint failure onto [`DbError::DuplicateKey`].
    pub fn from_sql(err: sqlx::Error, collection: &str, index: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => DbError::DuplicateKey {
                collection: collection.to_string(),
                index: index.to_string(),
            },
            _ => DbError::Sql(err),
        }
    }
}
