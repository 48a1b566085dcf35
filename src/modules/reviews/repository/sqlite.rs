use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use shelf_db::{DbError, SqlStore};

use super::{ReviewRepository, COLLECTION, OWNER_INDEX};
use crate::modules::reviews::models::{RatingSummary, Review, ReviewChanges};

const REVIEW_COLUMNS: &str = "id, book_id, user_id, rating, comment, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: String,
    book_id: String,
    user_id: String,
    rating: i64,
    comment: String,
    created_at: i64,
    updated_at: i64,
}

fn instant(millis: i64, field: &'static str) -> Result<DateTime<Utc>, DbError> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or(DbError::Corrupt { field })
}

impl TryFrom<ReviewRow> for Review {
    type Error = DbError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            rating: u8::try_from(row.rating).map_err(|_| DbError::Corrupt { field: "rating" })?,
            created_at: instant(row.created_at, "created_at")?,
            updated_at: instant(row.updated_at, "updated_at")?,
            id: row.id,
            book_id: row.book_id,
            user_id: row.user_id,
            comment: row.comment,
        })
    }
}

fn bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub struct SqlReviewRepository {
    pool: SqlitePool,
}

impl SqlReviewRepository {
    pub fn new(store: &SqlStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }
}

#[async_trait]
impl ReviewRepository for SqlReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO reviews (
                id, book_id, user_id, rating, comment, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&review.id)
        .bind(&review.book_id)
        .bind(&review.user_id)
        .bind(i64::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at.timestamp_millis())
        .bind(review.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|err| DbError::from_sql(err, COLLECTION, OWNER_INDEX.name))?;

        Ok(())
    }

    async fn find_by_owner(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, DbError> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = ? AND user_id = ?"
        ))
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Review::try_from)
        .transpose()
    }

    async fn latest_for_book(
        &self,
        book_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Review>, DbError> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
        ))
        .bind(book_id)
        .bind(bound(limit))
        .bind(bound(skip))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Review::try_from)
        .collect()
    }

    async fn rating_summary(&self, book_id: &str) -> Result<RatingSummary, DbError> {
        let (count, average): (i64, f64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(AVG(rating), 0.0) FROM reviews WHERE book_id = ?",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary {
            count: u64::try_from(count).map_err(|_| DbError::Corrupt { field: "count" })?,
            average,
        })
    }

    async fn update_owned(
        &self,
        book_id: &str,
        user_id: &str,
        changes: ReviewChanges,
    ) -> Result<Option<Review>, DbError> {
        let result = sqlx::query(
            "UPDATE reviews SET
                rating = COALESCE(?, rating),
                comment = COALESCE(?, comment),
                updated_at = ?
            WHERE book_id = ? AND user_id = ?",
        )
        .bind(changes.rating.map(i64::from))
        .bind(changes.comment)
        .bind(changes.updated_at.timestamp_millis())
        .bind(book_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_owner(book_id, user_id).await
    }

    async fn delete_owned(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, DbError> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "DELETE FROM reviews WHERE book_id = ? AND user_id = ? RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Review::try_from)
        .transpose()
    }
}
