//! Customer identity model and auth request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountResponse;

/// Represents a row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    /// `<salt hex>$<sha256 hex>`
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Registration opens the customer's first account, which receives the welcome bonus.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "quoc",
///   "full_name": "Nguyen Van Quoc",
///   "email": "quoc@example.com",
///   "password": "correct horse"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Returned by register and login. The token is also set as the session cookie.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Returned by `GET /api/v1/me`.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserResponse,
    pub accounts: Vec<AccountResponse>,
}
