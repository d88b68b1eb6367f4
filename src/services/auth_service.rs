//! Registration and login.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{account::Account, user::User},
    services::{account_service, policy, security},
};

const USER_COLUMNS: &str = "id, username, full_name, email, password_hash, created_at";

/// Create a user together with their first account (which earns the welcome bonus).
pub async fn register(
    pool: &DbPool,
    username: &str,
    full_name: &str,
    email: Option<&str>,
    password: &str,
) -> Result<(User, Account), AppError> {
    let username = username.trim();
    policy::ensure_username(username)?;
    policy::ensure_password(password)?;

    let full_name = full_name.trim();
    if full_name.is_empty() || full_name.chars().count() > 100 {
        return Err(AppError::validation("Full name must be 1-100 characters"));
    }

    let email = email.map(str::trim).filter(|e| !e.is_empty());
    if let Some(email) = email {
        if !email.contains('@') || email.len() > 254 {
            return Err(AppError::validation("Invalid email address"));
        }
    }

    let mut tx = pool.begin().await?;

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR (email IS NOT NULL AND email = $2))",
    )
    .bind(username)
    .bind(email)
    .fetch_one(&mut *tx)
    .await?;
    if taken {
        return Err(AppError::Conflict(
            "Username or email is already registered".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, full_name, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(full_name)
    .bind(email)
    .bind(security::hash_secret(password))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // lost a race with a concurrent registration of the same name
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            AppError::Conflict("Username or email is already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    let (account, _) = account_service::open_account(&mut tx, user.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((user, account))
}

/// Check credentials. Unknown users and wrong passwords look the same to the caller.
pub async fn login(pool: &DbPool, username: &str, password: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username.trim())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    if !security::verify_secret(password, &user.password_hash) {
        tracing::warn!(username = %user.username, "failed login");
        return Err(AppError::Unauthorized);
    }

    Ok(user)
}

pub async fn find_user(pool: &DbPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}
