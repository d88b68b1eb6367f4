//! Cashback handlers.

use axum::{
    Extension, Json,
    extract::State,
};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppQuery,
    middleware::auth::AuthContext,
    models::cashback::{CashbackQuery, CashbackSummary, RedeemCashbackResponse},
    services::{cashback_service, policy},
};

pub async fn get_cashback(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<CashbackQuery>,
) -> Result<Json<CashbackSummary>, AppError> {
    let (cashback_balance, history) =
        cashback_service::summary(&pool, auth.user_id, query.account_id).await?;

    Ok(Json(CashbackSummary {
        success: true,
        cashback_balance,
        redeemable: cashback_balance >= policy::CASHBACK_REDEEM_THRESHOLD,
        threshold: policy::CASHBACK_REDEEM_THRESHOLD,
        history,
    }))
}

/// Redeem the whole cashback balance into the main balance.
///
/// Fails with 422 while the cashback balance is below 100,000 VND.
pub async fn redeem_cashback(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<CashbackQuery>,
) -> Result<Json<RedeemCashbackResponse>, AppError> {
    let outcome = cashback_service::redeem(&pool, auth.user_id, query.account_id).await?;

    Ok(Json(RedeemCashbackResponse {
        success: true,
        amount: outcome.amount,
        new_balance: outcome.new_balance,
        transaction_id: outcome.transaction.id,
    }))
}
