//! Mobile recharge handler.

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::mobile::{RechargeRequest, RechargeResponse},
    services::recharge_service,
};

/// Top up a phone number.
///
/// # Request Body
///
/// ```json
/// {
///   "provider_id": "550e8400-...",
///   "phone_number": "0987654321",
///   "amount": 50000
/// }
/// ```
pub async fn create_recharge(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<RechargeRequest>,
) -> Result<Json<RechargeResponse>, AppError> {
    let outcome = recharge_service::recharge(&pool, auth.user_id, request).await?;

    Ok(Json(RechargeResponse {
        success: true,
        balance: outcome.balance,
        cashback: outcome.cashback,
        recharge: outcome.recharge,
    }))
}
