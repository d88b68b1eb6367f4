//! Account management HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/v1/accounts - Open an additional account
//! - GET /api/v1/accounts - List the caller's accounts
//! - GET /api/v1/accounts/{id} - Get account by ID
//! - POST /api/v1/accounts/{id}/lock and /unlock - Freeze or unfreeze
//! - PUT /api/v1/accounts/{id}/limits - Change transfer limits
//! - PUT /api/v1/accounts/{id}/pin - Set or change the PIN

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppJson, AppPath},
    middleware::auth::AuthContext,
    models::{
        DataResponse,
        account::{
            AccountResponse, CreateAccountResponse, MessageResponse, SetPinRequest,
            UnlockRequest, UpdateLimitsRequest,
        },
    },
    services::{account_service, account_store},
};

/// Open an additional account.
///
/// # Response
///
/// - **201 Created**: the new account. Only a customer's first account (opened
///   at registration) receives the welcome bonus, so `welcome_bonus` is 0 here
///   unless the customer somehow had none.
pub async fn create_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<(StatusCode, Json<CreateAccountResponse>), AppError> {
    let (account, welcome_bonus) = account_service::create_account(&pool, auth.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            success: true,
            account: account.into(),
            welcome_bonus,
        }),
    ))
}

/// Get a specific account by ID.
///
/// Returns 404 if the account doesn't exist OR belongs to another customer.
pub async fn get_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(account_id): AppPath<Uuid>,
) -> Result<Json<DataResponse<AccountResponse>>, AppError> {
    let mut conn = pool.acquire().await?;
    let account = account_store::find_owned(&mut conn, auth.user_id, Some(account_id)).await?;

    Ok(Json(DataResponse::ok(account.into())))
}

/// List the caller's accounts, primary (oldest) first.
pub async fn list_accounts(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DataResponse<Vec<AccountResponse>>>, AppError> {
    let mut conn = pool.acquire().await?;
    let accounts = account_store::list_for_user(&mut conn, auth.user_id).await?;

    Ok(Json(DataResponse::ok(
        accounts.into_iter().map(Into::into).collect(),
    )))
}

pub async fn lock_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(account_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    account_service::lock_account(&pool, auth.user_id, account_id).await?;

    Ok(Json(MessageResponse::ok("Account locked")))
}

/// Unlock an account. Requires the PIN when one is set.
pub async fn unlock_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(account_id): AppPath<Uuid>,
    AppJson(request): AppJson<UnlockRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    account_service::unlock_account(&pool, auth.user_id, account_id, request.pin.as_deref())
        .await?;

    Ok(Json(MessageResponse::ok("Account unlocked")))
}

pub async fn update_limits(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(account_id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateLimitsRequest>,
) -> Result<Json<DataResponse<AccountResponse>>, AppError> {
    let account = account_service::update_limits(
        &pool,
        auth.user_id,
        account_id,
        request.daily_limit,
        request.monthly_limit,
    )
    .await?;

    Ok(Json(DataResponse::ok(account.into())))
}

/// Set or change the account PIN.
///
/// # Request Body
///
/// ```json
/// { "current_pin": "123456", "new_pin": "654321" }
/// ```
///
/// `current_pin` may be omitted when the account has no PIN yet.
pub async fn set_pin(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(account_id): AppPath<Uuid>,
    AppJson(request): AppJson<SetPinRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    account_service::set_pin(
        &pool,
        auth.user_id,
        account_id,
        request.current_pin.as_deref(),
        &request.new_pin,
    )
    .await?;

    Ok(Json(MessageResponse::ok("PIN updated")))
}
