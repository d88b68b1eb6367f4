//! Registration, login and session handlers.
//!
//! - POST /api/v1/auth/register - Create user and first account, start a session
//! - POST /api/v1/auth/login - Start a session
//! - POST /api/v1/auth/logout - Clear the session cookie
//! - GET /api/v1/me - Current user with their accounts

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::{
        account::MessageResponse,
        user::{LoginRequest, ProfileResponse, RegisterRequest, SessionResponse, User},
    },
    services::{account_store, auth_service, security},
};

type SessionStarted = ([(header::HeaderName, String); 1], Json<SessionResponse>);

fn start_session(config: &Config, user: User) -> SessionStarted {
    let ttl = config.session_ttl();
    let (token, expires_at) = security::issue_token(&config.session_secret, user.id, ttl);
    let cookie = security::session_cookie(&token, ttl);

    (
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            success: true,
            user: user.into(),
            token,
            expires_at,
        }),
    )
}

/// Register a customer.
///
/// # Request Body
///
/// ```json
/// {
///   "username": "quoc",
///   "full_name": "Nguyen Van Quoc",
///   "password": "correct horse"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: session started, first account opened with the welcome bonus
/// - **400**: invalid username, password or name
/// - **409**: username or email already registered
pub async fn register(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, _account) = auth_service::register(
        &pool,
        &request.username,
        &request.full_name,
        request.email.as_deref(),
        &request.password,
    )
    .await?;

    Ok((StatusCode::CREATED, start_session(&config, user)))
}

pub async fn login(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::login(&pool, &request.username, &request.password).await?;

    tracing::info!(user_id = %user.id, "session started");
    Ok(start_session(&config, user))
}

pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, security::expired_session_cookie())],
        Json(MessageResponse::ok("Logged out")),
    )
}

pub async fn me(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = auth_service::find_user(&pool, auth.user_id).await?;

    let mut conn = pool.acquire().await?;
    let accounts = account_store::list_for_user(&mut conn, auth.user_id).await?;

    Ok(Json(ProfileResponse {
        success: true,
        user: user.into(),
        accounts: accounts.into_iter().map(Into::into).collect(),
    }))
}
