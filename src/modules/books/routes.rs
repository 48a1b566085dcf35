use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use shelf_authz::TokenService;
use shelf_http::{require_auth, ApiJson, ApiQuery, AppError, AuthUser};

use super::models::{Book, BookDetail, BookFilters, BookPage, BookUpdated, CreateBook};
use super::service::BookService;
use crate::utils::Pagination;

/// Paging values are kept raw so a bad number is reported with our message.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    fn pagination(&self) -> Result<Pagination, AppError> {
        Pagination::from_query(self.page.as_deref(), self.limit.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub author: Option<String>,
    pub genre: Option<String>,
    #[serde(flatten)]
    pub paging: PageQuery,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    #[serde(flatten)]
    pub paging: PageQuery,
}

pub fn router(service: Arc<BookService>, tokens: Arc<TokenService>) -> Router {
    let protected = Router::new()
        .route("/books", post(create_book))
        .route("/books/{id}", put(update_book))
        .route_layer(middleware::from_fn_with_state(tokens, require_auth));

    // Merged into the protected router so the unlayered GET handlers stay public.
    protected
        .merge(
            Router::new()
                .route("/books", get(list_books))
                .route("/books/{id}", get(get_book))
                .route("/search", get(search_books)),
        )
        .with_state(service)
}

async fn list_books(
    State(service): State<Arc<BookService>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<BookPage>, AppError> {
    let pagination = query.paging.pagination()?;
    let filters = BookFilters {
        author: query.author,
        genre: query.genre,
    };
    Ok(Json(service.list(&filters, pagination).await?))
}

async fn search_books(
    State(service): State<Arc<BookService>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<BookPage>, AppError> {
    let pagination = query.paging.pagination()?;
    Ok(Json(service.search(query.query.as_deref(), pagination).await?))
}

async fn get_book(
    State(service): State<Arc<BookService>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<BookDetail>, AppError> {
    let pagination = query.pagination()?;
    Ok(Json(service.get_by_id(&id, pagination).await?))
}

async fn create_book(
    State(service): State<Arc<BookService>>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    tracing::debug!(user_id = %user.user_id(), "creating book");
    let book = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(service): State<Arc<BookService>>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<Value>,
) -> Result<Json<BookUpdated>, AppError> {
    tracing::debug!(user_id = %user.user_id(), book_id = %id, "updating book");
    let book = service.update(&id, patch).await?;
    Ok(Json(BookUpdated {
        message: "Book updated successfully",
        book,
    }))
}
