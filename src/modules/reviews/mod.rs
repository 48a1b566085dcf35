pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use shelf_authz::TokenService;
use shelf_db::IndexSpec;
use shelf_kernel::{InitCtx, Migration, Module};

use super::{error_response, AppContext};
use crate::modules::books;
use service::ReviewService;

/// One review per user per book
pub struct ReviewsModule {
    service: Arc<ReviewService>,
    tokens: Arc<TokenService>,
}

impl ReviewsModule {
    pub fn new(service: Arc<ReviewService>, tokens: Arc<TokenService>) -> Self {
        Self { service, tokens }
    }
}

fn secured(
    summary: &str,
    status: &str,
    success: serde_json::Value,
    body: Option<&str>,
) -> serde_json::Value {
    let mut operation = json!({
        "summary": summary,
        "tags": ["Reviews"],
        "security": [{ "bearerAuth": [] }],
        "parameters": [{
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "string" }, "description": "Book id"
        }],
        "responses": {
            "400": error_response("Missing or out-of-range rating, empty comment"),
            "401": error_response("Missing, malformed or expired token"),
            "403": error_response("Token not accepted"),
            "404": error_response("Book or review not found")
        }
    });
    operation["responses"][status] = success;
    if let Some(schema) = body {
        operation["requestBody"] = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{schema}") }
                }
            }
        });
    }
    operation
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ctx.store.backend(),
            "reviews module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone(), self.tokens.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let receipt = json!({
            "description": "Review stored",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ReviewResponse" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/books/{id}/reviews": {
                    "post": secured("Review a book", "201", receipt.clone(), Some("ReviewInput"))
                },
                "/reviews/{id}": {
                    "put": secured("Update your review of a book", "200", receipt, Some("ReviewInput")),
                    "delete": secured(
                        "Delete your review of a book",
                        "200",
                        json!({ "description": "Review deleted" }),
                        None
                    )
                }
            },
            "components": {
                "schemas": {
                    "ReviewInput": {
                        "type": "object",
                        "properties": {
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string" }
                        }
                    },
                    "ReviewResponse": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "review": {
                                "type": "object",
                                "properties": {
                                    "comment": { "type": "string" },
                                    "rating": { "type": "integer" },
                                    "bookId": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![repository::OWNER_INDEX]
    }

    fn migrations(&self) -> Vec<Migration> {
        repository::migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

/// Create a new instance of the reviews module
pub fn create_module(ctx: &AppContext) -> Arc<dyn Module> {
    let service = ReviewService::new(
        repository::for_store(&ctx.store),
        books::repository::for_store(&ctx.store),
    );
    Arc::new(ReviewsModule::new(Arc::new(service), ctx.tokens.clone()))
}
