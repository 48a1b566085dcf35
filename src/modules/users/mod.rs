pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use shelf_db::IndexSpec;
use shelf_kernel::{InitCtx, Migration, Module};

use super::{error_response, AppContext};
use service::UserService;

/// User registration and login
pub struct UsersModule {
    service: Arc<UserService>,
}

impl UsersModule {
    pub fn new(service: Arc<UserService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            bcrypt_cost = ctx.settings.auth.bcrypt_cost,
            backend = ctx.store.backend(),
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/signup": {
                    "post": {
                        "summary": "Register a user",
                        "tags": ["Users"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Signup" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "User created" },
                            "400": error_response("Missing fields or email already registered")
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Exchange credentials for a bearer token valid for one day",
                        "tags": ["Users"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Login" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Token issued" },
                            "400": error_response("Missing fields"),
                            "401": error_response("Invalid credentials")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Signup": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string" }
                        },
                        "required": ["name", "email", "password"]
                    },
                    "Login": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string" }
                        },
                        "required": ["email", "password"]
                    }
                }
            }
        }))
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![repository::EMAIL_INDEX]
    }

    fn migrations(&self) -> Vec<Migration> {
        repository::migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module stopped");
        Ok(())
    }
}

/// Create a new instance of the users module
pub fn create_module(ctx: &AppContext) -> Arc<dyn Module> {
    let credentials = repository::for_store(&ctx.store);
    let service = UserService::new(credentials, ctx.passwords, ctx.tokens.clone());
    Arc::new(UsersModule::new(Arc::new(service)))
}
