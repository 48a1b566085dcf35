use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use shelf_http::AppError;

use super::models::{Book, BookChanges, BookDetail, BookFilters, BookPage, BookRef, CreateBook};
use super::query::BookQuery;
use super::repository::BookRepository;
use crate::modules::reviews::models::{ReviewPage, ReviewSummary};
use crate::modules::reviews::repository::ReviewRepository;
use crate::utils::Pagination;

/// Keys a client may change through `PUT /books/{id}`.
const UPDATABLE_FIELDS: [&str; 6] = [
    "title",
    "author",
    "genre",
    "description",
    "coverImage",
    "publishedDate",
];

/// Fields that may not be blanked out.
const REQUIRED_FIELDS: [&str; 3] = ["title", "author", "genre"];

/// Catalogue reads and writes.
pub struct BookService {
    books: Arc<dyn BookRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl BookService {
    pub fn new(books: Arc<dyn BookRepository>, reviews: Arc<dyn ReviewRepository>) -> Self {
        Self { books, reviews }
    }

    pub async fn list(
        &self,
        filters: &BookFilters,
        pagination: Pagination,
    ) -> Result<BookPage, AppError> {
        let query = BookQuery::listing(filters);
        let books = self
            .books
            .find(&query, pagination.skip(), pagination.limit())
            .await?;
        let total_books = self.books.count(&query).await?;

        Ok(BookPage {
            books,
            total_books,
            meta: pagination.meta(total_books),
        })
    }

    /// Substring search over title and author. An empty page is a 404.
    pub async fn search(
        &self,
        text: Option<&str>,
        pagination: Pagination,
    ) -> Result<BookPage, AppError> {
        let Some(text) = text.filter(|q| !q.trim().is_empty()) else {
            return Err(AppError::validation(
                vec![],
                "Search query parameter 'query' is required",
            ));
        };

        let query = BookQuery::search(text);
        let books = self
            .books
            .find(&query, pagination.skip(), pagination.limit())
            .await?;
        if books.is_empty() {
            return Err(AppError::not_found(
                "No books found matching your search criteria",
            ));
        }
        let total_books = self.books.count(&query).await?;

        Ok(BookPage {
            books,
            total_books,
            meta: pagination.meta(total_books),
        })
    }

    /// The book, its average rating and one page of its newest reviews.
    pub async fn get_by_id(
        &self,
        book_id: &str,
        pagination: Pagination,
    ) -> Result<BookDetail, AppError> {
        let Some(book) = self.books.find_by_id(book_id).await? else {
            return Err(AppError::not_found("Book not found"));
        };

        let ratings = self.reviews.rating_summary(book_id).await?;
        let reviews = self
            .reviews
            .latest_for_book(book_id, pagination.skip(), pagination.limit())
            .await?
            .into_iter()
            .map(ReviewSummary::from)
            .collect();

        Ok(BookDetail {
            book,
            average_rating: ratings.average,
            meta_reviews: ReviewPage {
                reviews,
                total_reviews: ratings.count,
                meta: pagination.meta(ratings.count),
            },
        })
    }

    pub async fn create(&self, request: CreateBook) -> Result<Book, AppError> {
        let (Some(title), Some(author), Some(genre)) = (
            non_empty(request.title),
            non_empty(request.author),
            non_empty(request.genre),
        ) else {
            return Err(AppError::validation(
                vec![],
                "title, author and genre are required",
            ));
        };

        let now = Utc::now();
        let book = Book {
            id: Uuid::now_v7().to_string(),
            title,
            author,
            genre,
            description: request.description.unwrap_or_default(),
            cover_image: request.cover_image.unwrap_or_default(),
            published_date: request.published_date.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.books.insert(&book).await?;
        tracing::info!(book_id = %book.id, "book created");
        Ok(book)
    }

    /// Apply a partial update given as a raw JSON object.
    pub async fn update(&self, book_id: &str, patch: Value) -> Result<BookRef, AppError> {
        let changes = validate_patch(patch, Utc::now())?;

        let Some(book) = self.books.update(book_id, &changes).await? else {
            return Err(AppError::not_found("Book not found"));
        };

        tracing::info!(book_id = %book.id, "book updated");
        Ok(BookRef {
            id: book.id,
            title: book.title,
        })
    }
}

fn validate_patch(patch: Value, now: DateTime<Utc>) -> Result<BookChanges, AppError> {
    let Value::Object(fields) = patch else {
        return Err(AppError::bad_request("Update body must be a JSON object"));
    };

    let invalid: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|key| !UPDATABLE_FIELDS.contains(key))
        .collect();
    if !invalid.is_empty() {
        let details = invalid.iter().map(|key| Value::from(*key)).collect();
        return Err(AppError::validation(
            details,
            format!("Invalid fields: {}", invalid.join(", ")),
        ));
    }

    if fields.is_empty() {
        return Err(AppError::validation(vec![], "No update data provided"));
    }

    let mut changes = BookChanges::at(now);
    for (key, value) in fields {
        let Value::String(text) = value else {
            return Err(AppError::validation(
                vec![Value::from(key.as_str())],
                format!("{key} must be a string"),
            ));
        };
        if REQUIRED_FIELDS.contains(&key.as_str()) && text.trim().is_empty() {
            return Err(AppError::validation(
                vec![Value::from(key.as_str())],
                format!("{key} cannot be empty"),
            ));
        }
        if let Some(slot) = changes.field_mut(&key) {
            *slot = Some(text);
        }
    }

    Ok(changes)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::repository::MemoryBookRepository;
    use crate::modules::reviews::models::Review;
    use crate::modules::reviews::repository::MemoryReviewRepository;
    use serde_json::json;
    use shelf_db::Database;

    fn service(db: &Database) -> BookService {
        BookService::new(
            Arc::new(MemoryBookRepository::new(db)),
            Arc::new(MemoryReviewRepository::new(db)),
        )
    }

    fn request(title: &str, author: &str, genre: &str) -> CreateBook {
        CreateBook {
            title: Some(title.into()),
            author: Some(author.into()),
            genre: Some(genre.into()),
            ..CreateBook::default()
        }
    }

    fn page(page: u64, limit: u64) -> Pagination {
        Pagination::new(page, limit).unwrap()
    }

    async fn add_review(db: &Database, book_id: &str, user_id: &str, rating: u8) {
        let now = Utc::now();
        MemoryReviewRepository::new(db)
            .insert(&Review {
                id: Uuid::now_v7().to_string(),
                book_id: book_id.into(),
                user_id: user_id.into(),
                rating,
                comment: format!("rated {rating}"),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_requires_title_author_and_genre() {
        let db = Database::in_memory("test");
        let err = service(&db)
            .create(request("Dune", "", "sf"))
            .await
            .unwrap_err();

        match err {
            AppError::Validation { message, .. } => {
                assert_eq!(message, "title, author and genre are required")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_defaults_optional_fields_to_empty() {
        let db = Database::in_memory("test");
        let book = service(&db).create(request("Dune", "Herbert", "sf")).await.unwrap();

        assert_eq!(book.description, "");
        assert_eq!(book.cover_image, "");
        assert_eq!(book.published_date, "");
        assert_eq!(book.created_at, book.updated_at);
    }

    #[tokio::test]
    async fn listing_paginates_and_reports_meta() {
        let db = Database::in_memory("test");
        let books = service(&db);
        for i in 0..7 {
            books.create(request(&format!("Book {i}"), "A", "sf")).await.unwrap();
        }

        let result = books.list(&BookFilters::default(), page(2, 5)).await.unwrap();
        assert_eq!(result.books.len(), 2);
        assert_eq!(result.books[0].title, "Book 5");
        assert_eq!(result.total_books, 7);
        assert_eq!(result.meta.total_pages, 2);
        assert!(!result.meta.next_page_available);
        assert!(result.meta.previous_page_available);
    }

    #[tokio::test]
    async fn average_rating_covers_every_review() {
        let db = Database::in_memory("test");
        let books = service(&db);
        let book = books.create(request("Dune", "Herbert", "sf")).await.unwrap();
        for (user, rating) in [("u1", 2), ("u2", 4), ("u3", 5)] {
            add_review(&db, &book.id, user, rating).await;
        }

        let detail = books.get_by_id(&book.id, page(1, 2)).await.unwrap();
        assert_eq!(detail.average_rating, 11.0 / 3.0);
        assert_eq!(detail.meta_reviews.total_reviews, 3);
        assert_eq!(detail.meta_reviews.reviews.len(), 2);
        assert!(detail.meta_reviews.meta.next_page_available);
    }

    #[tokio::test]
    async fn book_without_reviews_averages_zero() {
        let db = Database::in_memory("test");
        let books = service(&db);
        let book = books.create(request("Dune", "Herbert", "sf")).await.unwrap();

        let detail = books.get_by_id(&book.id, Pagination::default()).await.unwrap();
        assert_eq!(detail.average_rating, 0.0);
        assert!(detail.meta_reviews.reviews.is_empty());
        assert_eq!(detail.meta_reviews.meta.total_pages, 0);
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let db = Database::in_memory("test");
        let err = service(&db)
            .get_by_id("missing", Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_rejects_unknown_fields_by_name() {
        let db = Database::in_memory("test");
        let books = service(&db);
        let book = books.create(request("Dune", "Herbert", "sf")).await.unwrap();

        let err = books
            .update(&book.id, json!({"title": "Dune", "foo": "bar"}))
            .await
            .unwrap_err();
        match err {
            AppError::Validation { message, details, .. } => {
                assert_eq!(message, "Invalid fields: foo");
                assert_eq!(details, vec![json!("foo")]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_rejects_empty_body_and_blank_required_fields() {
        let db = Database::in_memory("test");
        let books = service(&db);
        let book = books.create(request("Dune", "Herbert", "sf")).await.unwrap();

        match books.update(&book.id, json!({})).await.unwrap_err() {
            AppError::Validation { message, .. } => assert_eq!(message, "No update data provided"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(matches!(
            books.update(&book.id, json!({"title": " "})).await.unwrap_err(),
            AppError::Validation { .. }
        ));
        assert!(matches!(
            books.update(&book.id, json!({"genre": 3})).await.unwrap_err(),
            AppError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn update_sets_fields_and_returns_reference() {
        let db = Database::in_memory("test");
        let books = service(&db);
        let book = books.create(request("Dune", "Herbert", "sf")).await.unwrap();

        let updated = books
            .update(&book.id, json!({"title": "Dune Messiah", "coverImage": "dm.png"}))
            .await
            .unwrap();
        assert_eq!(
            updated,
            BookRef {
                id: book.id.clone(),
                title: "Dune Messiah".into()
            }
        );

        let stored = books.get_by_id(&book.id, Pagination::default()).await.unwrap().book;
        assert_eq!(stored.cover_image, "dm.png");
        assert_eq!(stored.author, "Herbert");
        assert!(stored.updated_at >= book.updated_at);

        assert!(matches!(
            books.update("missing", json!({"title": "x"})).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn search_matches_literally_and_404s_when_empty() {
        let db = Database::in_memory("test");
        let books = service(&db);
        books.create(request("Dune", "Frank Herbert", "sf")).await.unwrap();
        books.create(request("C++ Primer", "Lippman", "cs")).await.unwrap();

        let hits = books.search(Some("HERB"), Pagination::default()).await.unwrap();
        assert_eq!(hits.total_books, 1);
        assert_eq!(hits.books[0].title, "Dune");

        let hits = books.search(Some("c++"), Pagination::default()).await.unwrap();
        assert_eq!(hits.books[0].title, "C++ Primer");

        match books.search(Some("tolkien"), Pagination::default()).await.unwrap_err() {
            AppError::NotFound { message, .. } => {
                assert_eq!(message, "No books found matching your search criteria")
            }
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(matches!(
            books.search(None, Pagination::default()).await.unwrap_err(),
            AppError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn whitespace_search_is_rejected_as_missing() {
        let db = Database::in_memory("test");
        let books = service(&db);
        books.create(request("Dune", "Frank Herbert", "sf")).await.unwrap();

        match books.search(Some("   "), Pagination::default()).await.unwrap_err() {
            AppError::Validation { message, .. } => {
                assert_eq!(message, "Search query parameter 'query' is required")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
