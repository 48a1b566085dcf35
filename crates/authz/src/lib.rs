//! Authentication primitives: identity tokens, password hashing, and the
//! identity attached to authenticated requests.

pub mod password;
pub mod token;

use thiserror::Error;

pub use password::PasswordHasher;
pub use token::{Claims, TokenService};

/// Identity decoded from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token expired")]
    Expired,

    /// Unparseable token or signature mismatch.
    #[error("token malformed")]
    Malformed,

    /// Any other validation failure, e.g. not yet valid.
    #[error("token invalid")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}
