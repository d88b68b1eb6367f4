//! Session/identity guard middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the session token from the `Authorization` header or the session cookie
//! 2. Verify its signature and expiry
//! 3. Inject the caller's identity into the request
//! 4. Reject unauthenticated requests with HTTP 401

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{config::Config, error::AppError, services::security};

/// Authentication context attached to authenticated requests.
///
/// Route handlers extract it with `Extension<AuthContext>`; every feature
/// operation uses `user_id` to find the account it acts on.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Session authentication middleware function.
///
/// # Headers
///
/// Either of:
/// ```text
/// Authorization: Bearer <token>
/// Cookie: quocbank_session=<token>
/// ```
///
/// The bearer header wins when both are present.
pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(security::token_from_cookie_header);

    let token = bearer.or(cookie).ok_or(AppError::Unauthorized)?;

    let claims = security::verify_token(&config.session_secret, token, Utc::now())
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthContext {
        user_id: claims.user_id,
    });

    Ok(next.run(request).await)
}
