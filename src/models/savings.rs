//! Term savings models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A term deposit funded from an account.
///
/// Lifecycle is ACTIVE -> INACTIVE on withdrawal, with no way back.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SavingsAccount {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub principal: i64,
    pub term_months: i32,
    /// Annual rate in basis points (750 = 7.5%)
    pub interest_rate_bp: i32,
    pub maturity_date: DateTime<Utc>,
    pub is_active: bool,
    /// Principal plus interest paid back on withdrawal
    pub payout: Option<i64>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSavingsRequest {
    pub amount: i64,
    pub term_months: i32,
    pub name: String,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreateSavingsResponse {
    pub success: bool,
    pub message: String,
    pub savings: SavingsAccount,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct WithdrawSavingsResponse {
    pub success: bool,
    pub message: String,
    pub principal: i64,
    pub interest: i64,
    pub total_amount: i64,
    pub matured: bool,
    pub balance: i64,
}
