use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique across all users
    pub email: String,
    /// bcrypt hash, never the plain password
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /signup`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for `POST /login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    /// Email of the created account
    pub user: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}
