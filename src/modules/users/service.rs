use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use shelf_authz::{PasswordHasher, TokenService};
use shelf_http::AppError;

use super::models::{LoginRequest, SignupRequest, User};
use super::repository::CredentialStore;

/// Registration and login.
pub struct UserService {
    users: Arc<dyn CredentialStore>,
    passwords: PasswordHasher,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        passwords: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Create an account and return its email.
    pub async fn signup(&self, request: SignupRequest) -> Result<String, AppError> {
        let (Some(name), Some(email), Some(password)) = (
            non_empty(request.name),
            non_empty(request.email),
            non_empty(request.password),
        ) else {
            return Err(AppError::validation(
                vec![],
                "name, email and password are required",
            ));
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(vec![], "User already exists"));
        }

        let user = User {
            id: Uuid::now_v7().to_string(),
            name,
            email,
            password_hash: self.passwords.hash(&password).await?,
            created_at: Utc::now(),
        };

        // The unique email index catches a concurrent signup that passed the check above.
        self.users.insert(&user).await.map_err(|e| {
            if e.is_duplicate_key() {
                AppError::conflict(vec![], "User already exists")
            } else {
                AppError::from(e)
            }
        })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user.email)
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, request: LoginRequest) -> Result<String, AppError> {
        let (Some(email), Some(password)) = (non_empty(request.email), non_empty(request.password))
        else {
            return Err(AppError::validation(
                vec![],
                "email and password are required",
            ));
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(AppError::unauthorized("Invalid credentials"));
        };
        if !self.passwords.verify(&password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "password mismatch");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let token = self.tokens.issue(&user.id)?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(token)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
