//! Cashback accrual history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cashback_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashbackStatus {
    Pending,
    Redeemed,
}

/// One accrual. PENDING until the whole cashback balance is redeemed.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CashbackEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub amount: i64,
    pub status: CashbackStatus,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CashbackQuery {
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CashbackSummary {
    pub success: bool,
    pub cashback_balance: i64,
    pub redeemable: bool,
    pub threshold: i64,
    pub history: Vec<CashbackEntry>,
}

#[derive(Debug, Serialize)]
pub struct RedeemCashbackResponse {
    pub success: bool,
    pub amount: i64,
    pub new_balance: i64,
    pub transaction_id: Uuid,
}
