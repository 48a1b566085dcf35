use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::PageMeta;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Stored review. At most one exists per (book, user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
    // Numeric so that recency sorting compares instants, not strings.
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Public view of a review inside a book page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReviewSummary {
    pub comment: String,
    pub rating: u8,
}

impl From<Review> for ReviewSummary {
    fn from(review: Review) -> Self {
        Self {
            comment: review.comment,
            rating: review.rating,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<ReviewSummary>,
    pub total_reviews: u64,
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// Count and mean rating over every review of a book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub count: u64,
    /// 0 when there are no reviews
    pub average: f64,
}

/// Request body for creating a review.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReview {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Request body for updating a review; at least one field must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReview {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Validated field changes applied to an existing review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewChanges {
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub comment: String,
    pub rating: u8,
    pub book_id: String,
}

impl From<Review> for ReviewReceipt {
    fn from(review: Review) -> Self {
        Self {
            comment: review.comment,
            rating: review.rating,
            book_id: review.book_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub message: &'static str,
    pub review: ReviewReceipt,
}
