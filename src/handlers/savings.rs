//! Term savings handlers.

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
        savings::{
            CreateSavingsRequest, CreateSavingsResponse, SavingsAccount, WithdrawSavingsResponse,
        },
    },
    services::savings_service,
};

/// Open a term deposit.
///
/// # Request Body
///
/// ```json
/// { "amount": 1000000, "term_months": 12, "name": "Tet fund" }
/// ```
///
/// Supported terms: 1, 3, 6, 12 and 24 months.
pub async fn create_savings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateSavingsRequest>,
) -> Result<(StatusCode, Json<CreateSavingsResponse>), AppError> {
    let (savings, balance) = savings_service::create_savings(
        &pool,
        auth.user_id,
        request.account_id,
        request.amount,
        request.term_months,
        &request.name,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSavingsResponse {
            success: true,
            message: format!("Savings \"{}\" opened", savings.name),
            savings,
            balance,
        }),
    ))
}

pub async fn list_savings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DataResponse<Vec<SavingsAccount>>>, AppError> {
    let savings = savings_service::list_savings(&pool, auth.user_id).await?;

    Ok(Json(DataResponse::ok(savings)))
}

/// Withdraw a term deposit. Before maturity only half the rate is paid on elapsed months.
pub async fn withdraw_savings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(savings_id): AppPath<Uuid>,
) -> Result<Json<WithdrawSavingsResponse>, AppError> {
    let withdrawal = savings_service::withdraw_savings(&pool, auth.user_id, savings_id).await?;

    let message = if withdrawal.matured {
        "Savings withdrawn at maturity"
    } else {
        "Savings withdrawn early at the reduced rate"
    };

    Ok(Json(WithdrawSavingsResponse {
        success: true,
        message: message.to_string(),
        principal: withdrawal.principal,
        interest: withdrawal.interest,
        total_amount: withdrawal.total_amount,
        matured: withdrawal.matured,
        balance: withdrawal.balance,
    }))
}
