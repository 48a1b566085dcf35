pub mod models;
pub mod query;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use shelf_authz::TokenService;
use shelf_kernel::{InitCtx, Migration, Module};

use super::{error_response, paging_parameters, AppContext};
use service::BookService;
use crate::modules::reviews;

/// Book catalogue: listing, search, details, create and update
pub struct BooksModule {
    service: Arc<BookService>,
    tokens: Arc<TokenService>,
}

impl BooksModule {
    pub fn new(service: Arc<BookService>, tokens: Arc<TokenService>) -> Self {
        Self { service, tokens }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ctx.store.backend(),
            "books module initialized"
        );
        Ok(())
    }

    fn migrations(&self) -> Vec<Migration> {
        repository::migrations()
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone(), self.tokens.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let mut list_parameters = vec![
            json!({ "name": "author", "in": "query", "schema": { "type": "string" },
                    "description": "Exact author, or comma-separated list of authors" }),
            json!({ "name": "genre", "in": "query", "schema": { "type": "string" },
                    "description": "Exact genre, or comma-separated list of genres" }),
        ];
        list_parameters.extend(paging_parameters());

        let mut search_parameters = vec![json!({
            "name": "query", "in": "query", "required": true, "schema": { "type": "string" },
            "description": "Case-insensitive substring of the title or author"
        })];
        search_parameters.extend(paging_parameters());

        let mut detail_parameters = vec![book_id_parameter()];
        detail_parameters.extend(paging_parameters());

        Some(json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": list_parameters,
                        "responses": {
                            "200": page_of_books(),
                            "400": error_response("Invalid page or limit")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookInput" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Book created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": error_response("Missing title, author or genre"),
                            "401": error_response("Missing, malformed or expired token"),
                            "403": error_response("Token not accepted")
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Book with average rating and a page of its newest reviews",
                        "tags": ["Books"],
                        "parameters": detail_parameters,
                        "responses": {
                            "200": {
                                "description": "Book details",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookDetail" }
                                    }
                                }
                            },
                            "404": error_response("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Partially update a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [book_id_parameter()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookInput" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Book updated successfully" },
                            "400": error_response("Unknown, empty or non-string fields"),
                            "401": error_response("Missing, malformed or expired token"),
                            "403": error_response("Token not accepted"),
                            "404": error_response("Book not found")
                        }
                    }
                },
                "/search": {
                    "get": {
                        "summary": "Search books by title or author",
                        "tags": ["Books"],
                        "parameters": search_parameters,
                        "responses": {
                            "200": page_of_books(),
                            "400": error_response("Missing query, invalid page or limit"),
                            "404": error_response("No books found matching your search criteria")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Unique identifier for the book" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "description": { "type": "string" },
                            "coverImage": { "type": "string" },
                            "publishedDate": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "genre", "createdAt", "updatedAt"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "description": { "type": "string" },
                            "coverImage": { "type": "string" },
                            "publishedDate": { "type": "string" }
                        }
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "totalBooks": { "type": "integer" },
                            "totalPages": { "type": "integer" },
                            "currentPage": { "type": "integer" },
                            "nextPageAvailable": { "type": "boolean" },
                            "previousPageAvailable": { "type": "boolean" }
                        }
                    },
                    "BookDetail": {
                        "type": "object",
                        "properties": {
                            "book": { "$ref": "#/components/schemas/Book" },
                            "averageRating": { "type": "number" },
                            "metaReviews": {
                                "type": "object",
                                "properties": {
                                    "reviews": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "comment": { "type": "string" },
                                                "rating": { "type": "integer" }
                                            }
                                        }
                                    },
                                    "totalReviews": { "type": "integer" },
                                    "totalPages": { "type": "integer" },
                                    "currentPage": { "type": "integer" },
                                    "nextPageAvailable": { "type": "boolean" },
                                    "previousPageAvailable": { "type": "boolean" }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn book_id_parameter() -> serde_json::Value {
    json!({ "name": "id", "in": "path", "required": true, "schema": { "type": "string" } })
}

fn page_of_books() -> serde_json::Value {
    json!({
        "description": "One page of books",
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookPage" }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(ctx: &AppContext) -> Arc<dyn Module> {
    let service = BookService::new(
        repository::for_store(&ctx.store),
        reviews::repository::for_store(&ctx.store),
    );
    Arc::new(BooksModule::new(Arc::new(service), ctx.tokens.clone()))
}
