use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use shelf_db::DbError;
use shelf_http::AppError;

use super::models::{
    CreateReview, Review, ReviewChanges, ReviewReceipt, UpdateReview, MAX_RATING, MIN_RATING,
};
use super::repository::ReviewRepository;
use crate::modules::books::repository::BookRepository;

const ALREADY_EXISTS: &str = "Review already exists";

/// Reviews written by authenticated users. Every operation acts on the
/// caller's own review of the given book.
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    books: Arc<dyn BookRepository>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepository>, books: Arc<dyn BookRepository>) -> Self {
        Self { reviews, books }
    }

    pub async fn create(
        &self,
        book_id: &str,
        actor_id: &str,
        request: CreateReview,
    ) -> Result<ReviewReceipt, AppError> {
        let (Some(rating), Some(comment)) = (
            request.rating.filter(|r| *r != 0),
            request.comment.filter(|c| !c.trim().is_empty()),
        ) else {
            return Err(AppError::validation(
                vec![],
                "Rating and comment are required",
            ));
        };
        let rating = checked_rating(rating)?;

        if self.books.find_by_id(book_id).await?.is_none() {
            return Err(AppError::not_found("Book not found"));
        }
        if self.reviews.find_by_owner(book_id, actor_id).await?.is_some() {
            return Err(AppError::conflict(vec![], ALREADY_EXISTS));
        }

        let now = Utc::now();
        let review = Review {
            id: Uuid::now_v7().to_string(),
            book_id: book_id.to_string(),
            user_id: actor_id.to_string(),
            rating,
            comment,
            created_at: now,
            updated_at: now,
        };

        // A concurrent create that passed the check above trips the pair index.
        self.reviews.insert(&review).await.map_err(duplicate_as_conflict)?;

        tracing::info!(book_id, user_id = actor_id, rating, "review created");
        Ok(review.into())
    }

    pub async fn update(
        &self,
        book_id: &str,
        actor_id: &str,
        request: UpdateReview,
    ) -> Result<ReviewReceipt, AppError> {
        if request.rating.is_none() && request.comment.is_none() {
            return Err(AppError::validation(
                vec![],
                "rating or comment is required",
            ));
        }

        let rating = request.rating.map(checked_rating).transpose()?;
        if let Some(comment) = &request.comment {
            if comment.trim().is_empty() {
                return Err(AppError::validation(
                    vec![serde_json::Value::from("comment")],
                    "Comment cannot be empty",
                ));
            }
        }

        let changes = ReviewChanges {
            rating,
            comment: request.comment,
            updated_at: Utc::now(),
        };
        let Some(review) = self.reviews.update_owned(book_id, actor_id, changes).await? else {
            return Err(AppError::not_found("Review not found"));
        };

        tracing::info!(book_id, user_id = actor_id, "review updated");
        Ok(review.into())
    }

    pub async fn delete(&self, book_id: &str, actor_id: &str) -> Result<(), AppError> {
        if self.reviews.delete_owned(book_id, actor_id).await?.is_none() {
            return Err(AppError::not_found("Review not found"));
        }

        tracing::info!(book_id, user_id = actor_id, "review deleted");
        Ok(())
    }
}

fn checked_rating(rating: i64) -> Result<u8, AppError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::validation(
            vec![serde_json::Value::from("rating")],
            format!("Rating must be between {MIN_RATING} and {MAX_RATING}"),
        ));
    }
    u8::try_from(rating).map_err(|e| AppError::Internal(e.into()))
}

fn duplicate_as_conflict(err: DbError) -> AppError {
    if err.is_duplicate_key() {
        AppError::conflict(vec![], ALREADY_EXISTS)
    } else {
        AppError::from(err)
    }
}
