use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{post, put},
    Json, Router,
};
use serde::Serialize;

use shelf_authz::TokenService;
use shelf_http::{require_auth, ApiJson, AppError, AuthUser};

use super::models::{CreateReview, ReviewResponse, UpdateReview};
use super::service::ReviewService;

#[derive(Debug, Serialize)]
pub struct ReviewDeleted {
    pub message: &'static str,
}

/// Every review route requires a bearer token. `{id}` is always a book id:
/// a caller has at most one review per book.
pub fn router(service: Arc<ReviewService>, tokens: Arc<TokenService>) -> Router {
    Router::new()
        .route("/books/{id}/reviews", post(create_review))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .route_layer(middleware::from_fn_with_state(tokens, require_auth))
        .with_state(service)
}

async fn create_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthUser,
    Path(book_id): Path<String>,
    ApiJson(request): ApiJson<CreateReview>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let review = service.create(&book_id, user.user_id(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review created",
            review,
        }),
    ))
}

async fn update_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthUser,
    Path(book_id): Path<String>,
    ApiJson(request): ApiJson<UpdateReview>,
) -> Result<Json<ReviewResponse>, AppError> {
    let review = service.update(&book_id, user.user_id(), request).await?;
    Ok(Json(ReviewResponse {
        message: "Review updated",
        review,
    }))
}

async fn delete_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthUser,
    Path(book_id): Path<String>,
) -> Result<Json<ReviewDeleted>, AppError> {
    service.delete(&book_id, user.user_id()).await?;
    Ok(Json(ReviewDeleted {
        message: "Review deleted",
    }))
}
