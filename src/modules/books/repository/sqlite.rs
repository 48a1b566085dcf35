use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use shelf_db::{DbError, SqlStore};

use super::BookRepository;
use crate::modules::books::models::{Book, BookChanges};
use crate::modules::books::query::{BookQuery, FieldMatch};

const SELECT_BOOKS: &str = "SELECT id, title, author, genre, description, cover_image, \
                            published_date, created_at, updated_at FROM books";

pub struct SqlBookRepository {
    pool: SqlitePool,
}

impl SqlBookRepository {
    pub fn new(store: &SqlStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }
}

/// Append the WHERE clause for `query`.
fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, query: &BookQuery) {
    match query {
        BookQuery::Listing { author, genre } => {
            let mut keyword = " WHERE ";
            for (column, matcher) in [("author", author), ("genre", genre)] {
                let Some(matcher) = matcher else { continue };
                builder.push(keyword);
                push_match(builder, column, matcher);
                keyword = " AND ";
            }
        }
        // lower() folds ASCII only.
        BookQuery::Search(text) => {
            builder
                .push(" WHERE instr(lower(title), lower(")
                .push_bind(text.clone())
                .push(")) > 0 OR instr(lower(author), lower(")
                .push_bind(text.clone())
                .push(")) > 0");
        }
    }
}

fn push_match(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, matcher: &FieldMatch) {
    match matcher {
        FieldMatch::Exact(value) => {
            builder.push(column).push(" = ").push_bind(value.clone());
        }
        FieldMatch::AnyOf(values) if values.is_empty() => {
            builder.push("0");
        }
        FieldMatch::AnyOf(values) => {
            builder.push(column).push(" IN (");
            let mut list = builder.separated(", ");
            for value in values {
                list.push_bind(value.clone());
            }
            list.push_unseparated(")");
        }
    }
}

fn bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn insert(&self, book: &Book) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO books (
                id, title, author, genre, description, cover_image,
                published_date, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(&book.cover_image)
        .bind(&book.published_date)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Book>, DbError> {
        let book = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOKS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find(&self, query: &BookQuery, skip: u64, limit: u64) -> Result<Vec<Book>, DbError> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_BOOKS);
        push_conditions(&mut builder, query);
        builder
            .push(" ORDER BY rowid LIMIT ")
            .push_bind(bound(limit))
            .push(" OFFSET ")
            .push_bind(bound(skip));

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn count(&self, query: &BookQuery) -> Result<u64, DbError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books");
        push_conditions(&mut builder, query);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|_| DbError::Corrupt { field: "count" })
    }

    async fn update(&self, id: &str, changes: &BookChanges) -> Result<Option<Book>, DbError> {
        let result = sqlx::query(
            "UPDATE books SET
                title = COALESCE(?, title),
                author = COALESCE(?, author),
                genre = COALESCE(?, genre),
                description = COALESCE(?, description),
                cover_image = COALESCE(?, cover_image),
                published_date = COALESCE(?, published_date),
                updated_at = ?
            WHERE id = ?",
        )
        .bind(changes.title.as_deref())
        .bind(changes.author.as_deref())
        .bind(changes.genre.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.cover_image.as_deref())
        .bind(changes.published_date.as_deref())
        .bind(changes.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }
}
