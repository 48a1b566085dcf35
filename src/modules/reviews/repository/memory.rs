use async_trait::async_trait;
use serde_json::json;

use shelf_db::{
    from_document, to_document, Collection, Database, DbError, Document, Filter, FindOptions,
    SortDirection,
};

use super::{ReviewRepository, COLLECTION};
use crate::modules::reviews::models::{RatingSummary, Review, ReviewChanges};

pub struct MemoryReviewRepository {
    reviews: Collection,
}

impl MemoryReviewRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            reviews: db.collection(COLLECTION),
        }
    }
}

fn owned_by(book_id: &str, user_id: &str) -> Filter {
    Filter::And(vec![
        Filter::eq("bookId", book_id),
        Filter::eq("userId", user_id),
    ])
}

fn change_set(changes: ReviewChanges) -> Document {
    let mut doc = Document::new();
    if let Some(rating) = changes.rating {
        doc.insert("rating".into(), json!(rating));
    }
    if let Some(comment) = changes.comment {
        doc.insert("comment".into(), json!(comment));
    }
    doc.insert(
        "updatedAt".into(),
        json!(changes.updated_at.timestamp_millis()),
    );
    doc
}

#[async_trait]
impl ReviewRepository for MemoryReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), DbError> {
        self.reviews.insert_one(to_document(review)?).await
    }

    async fn find_by_owner(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, DbError> {
        self.reviews
            .find_one(&owned_by(book_id, user_id))
            .await?
            .map(from_document)
            .transpose()
    }

    async fn latest_for_book(
        &self,
        book_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Review>, DbError> {
        let options = FindOptions::new()
            .sort_by("createdAt", SortDirection::Descending)
            .skip(skip)
            .limit(limit);

        self.reviews
            .find(&Filter::eq("bookId", book_id), &options)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    async fn rating_summary(&self, book_id: &str) -> Result<RatingSummary, DbError> {
        let reviews = self
            .reviews
            .find(&Filter::eq("bookId", book_id), &FindOptions::new())
            .await?;

        let count = reviews.len() as u64;
        let total: f64 = reviews
            .iter()
            .filter_map(|doc| doc.get("rating").and_then(|r| r.as_f64()))
            .sum();
        let average = if count == 0 { 0.0 } else { total / count as f64 };

        Ok(RatingSummary { count, average })
    }

    async fn update_owned(
        &self,
        book_id: &str,
        user_id: &str,
        changes: ReviewChanges,
    ) -> Result<Option<Review>, DbError> {
        self.reviews
            .update_one(&owned_by(book_id, user_id), change_set(changes))
            .await?
            .map(from_document)
            .transpose()
    }

    async fn delete_owned(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, DbError> {
        self.reviews
            .delete_one(&owned_by(book_id, user_id))
            .await?
            .map(from_document)
            .transpose()
    }
}
