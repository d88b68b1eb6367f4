//! Piggy bank handlers.

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
        piggy_bank::{
            CreatePiggyBankRequest, PiggyBank, PiggyBankResponse, PiggyDepositRequest,
            PiggyWithdrawRequest,
        },
    },
    services::piggy_bank_service,
};

pub async fn create_piggy_bank(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreatePiggyBankRequest>,
) -> Result<(StatusCode, Json<DataResponse<PiggyBank>>), AppError> {
    let piggy = piggy_bank_service::create_piggy_bank(&pool, auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(DataResponse::ok(piggy))))
}

pub async fn list_piggy_banks(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DataResponse<Vec<PiggyBank>>>, AppError> {
    let piggy_banks = piggy_bank_service::list_piggy_banks(&pool, auth.user_id).await?;

    Ok(Json(DataResponse::ok(piggy_banks)))
}

pub async fn deposit(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(piggy_id): AppPath<Uuid>,
    AppJson(request): AppJson<PiggyDepositRequest>,
) -> Result<Json<PiggyBankResponse>, AppError> {
    let (piggy_bank, balance) =
        piggy_bank_service::deposit(&pool, auth.user_id, piggy_id, request.amount).await?;

    Ok(Json(PiggyBankResponse {
        success: true,
        message: format!("Added {} VND to {}", request.amount, piggy_bank.name),
        piggy_bank,
        balance,
    }))
}

/// Withdraw from a piggy bank. Send `{}` to empty it, which also closes it.
pub async fn withdraw(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(piggy_id): AppPath<Uuid>,
    AppJson(request): AppJson<PiggyWithdrawRequest>,
) -> Result<Json<PiggyBankResponse>, AppError> {
    let (piggy_bank, balance) =
        piggy_bank_service::withdraw(&pool, auth.user_id, piggy_id, request.amount).await?;

    let message = if piggy_bank.is_active {
        format!("Withdrew from {}", piggy_bank.name)
    } else {
        format!("{} emptied and closed", piggy_bank.name)
    };

    Ok(Json(PiggyBankResponse {
        success: true,
        message,
        piggy_bank,
        balance,
    }))
}
