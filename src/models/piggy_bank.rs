//! Piggy bank (named savings goal) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named sub-balance funded from and returned to its owning account.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PiggyBank {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub target_amount: i64,
    pub current_amount: i64,
    pub icon: String,
    pub color: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePiggyBankRequest {
    pub name: String,
    pub target_amount: i64,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PiggyDepositRequest {
    pub amount: i64,
}

/// Withdraw body. A missing amount empties the piggy bank.
#[derive(Debug, Default, Deserialize)]
pub struct PiggyWithdrawRequest {
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PiggyBankResponse {
    pub success: bool,
    pub message: String,
    pub piggy_bank: PiggyBank,
    pub balance: i64,
}
