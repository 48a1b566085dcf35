pub mod books;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use serde_json::{json, Value};

use shelf_authz::{PasswordHasher, TokenService};
use shelf_db::Store;
use shelf_kernel::{ModuleRegistry, Settings};

/// Shared handles every module is built from.
#[derive(Clone)]
pub struct AppContext {
    pub store: Store,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
}

impl AppContext {
    pub fn new(settings: &Settings, store: Store) -> Self {
        Self {
            store,
            tokens: Arc::new(TokenService::from_settings(&settings.auth)),
            passwords: PasswordHasher::new(settings.auth.bcrypt_cost),
        }
    }
}

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, ctx: &AppContext) {
    registry.register(users::create_module(ctx));
    registry.register(books::create_module(ctx));
    registry.register(reviews::create_module(ctx));
}

/// OpenAPI response object pointing at the shared error schema.
pub(crate) fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

pub(crate) fn paging_parameters() -> [Value; 2] {
    [
        json!({ "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } }),
        json!({ "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 5 } }),
    ]
}
