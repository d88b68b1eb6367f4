//! Money movement HTTP handlers.
//!
//! This module implements the core ledger endpoints:
//! - POST /api/v1/transfers - Send money to another customer
//! - POST /api/v1/deposits - Cash deposit / top-up
//! - POST /api/v1/withdrawals - Cash withdrawal
//! - POST /api/v1/bills/pay - Utility bill payment
//! - GET /api/v1/transactions - History of one of the caller's accounts
//! - GET /api/v1/transactions/{id} - Get transaction details

use axum::{
    Extension, Json,
    extract::State,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AuthContext,
    models::{
        DataResponse,
        transaction::{
            DepositRequest, DepositResponse, HistoryQuery, PayBillRequest, PayBillResponse,
            TransactionResponse, TransferRequest, TransferResponse, WithdrawRequest,
            WithdrawResponse,
        },
    },
    services::transaction_service,
};

/// Transfer money to another customer.
///
/// # Request Body
///
/// ```json
/// {
///   "recipient": "970412345678",
///   "amount": 100000,
///   "message": "Lunch"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "message": "Transferred 100000 VND to 970412345678",
///   "new_balance": 899500,
///   "fee": 500,
///   "transaction_id": "770e8400-..."
/// }
/// ```
///
/// # Atomicity
///
/// The debit, the credit and the ledger entry commit together or not at all.
pub async fn create_transfer(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<TransferRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    let amount = request.amount;
    let outcome = transaction_service::transfer(&pool, auth.user_id, request).await?;

    Ok(Json(TransferResponse {
        success: true,
        message: format!(
            "Transferred {} VND to {}",
            amount, outcome.recipient_account_number
        ),
        new_balance: outcome.new_balance,
        fee: outcome.fee,
        transaction_id: outcome.transaction.id,
    }))
}

pub async fn create_deposit(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<DepositRequest>,
) -> Result<Json<DepositResponse>, AppError> {
    let outcome = transaction_service::deposit(&pool, auth.user_id, request).await?;

    Ok(Json(DepositResponse {
        success: true,
        balance: outcome.balance,
        transaction_id: outcome.transaction.id,
    }))
}

/// Withdraw cash.
///
/// # Validation
///
/// - At least 50,000 VND and a multiple of 10,000
/// - PIN required when the account has one
/// - Balance must cover the amount plus the 0.5% fee
pub async fn create_withdrawal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, AppError> {
    let outcome = transaction_service::withdraw(&pool, auth.user_id, request).await?;

    Ok(Json(WithdrawResponse {
        success: true,
        balance: outcome.balance,
        fee: outcome.transaction.fee,
        transaction_id: outcome.transaction.id,
    }))
}

pub async fn pay_bill(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<PayBillRequest>,
) -> Result<Json<PayBillResponse>, AppError> {
    let outcome = transaction_service::pay_bill(&pool, auth.user_id, request).await?;

    Ok(Json(PayBillResponse {
        success: true,
        message: format!(
            "Paid {} VND to {}",
            outcome.transaction.amount, outcome.provider_name
        ),
        balance: outcome.balance,
        cashback: outcome.cashback,
        transaction_id: outcome.transaction.id,
    }))
}

/// List ledger rows of one of the caller's accounts, newest first.
///
/// Query parameters: `account_id` (defaults to the primary account), `limit` (1-100, default 20), `offset`.
pub async fn list_transactions(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<Json<DataResponse<Vec<TransactionResponse>>>, AppError> {
    let rows = transaction_service::history(
        &pool,
        auth.user_id,
        query.account_id,
        query.limit,
        query.offset,
    )
    .await?;

    Ok(Json(DataResponse::ok(
        rows.into_iter().map(Into::into).collect(),
    )))
}

/// Get transaction by ID.
///
/// # Security
///
/// Returns 404 if the transaction doesn't involve any of the caller's accounts.
pub async fn get_transaction(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(transaction_id): AppPath<Uuid>,
) -> Result<Json<DataResponse<TransactionResponse>>, AppError> {
    let transaction =
        transaction_service::get_transaction(&pool, auth.user_id, transaction_id).await?;

    Ok(Json(DataResponse::ok(transaction.into())))
}
