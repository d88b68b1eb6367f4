//! Mobile top-up models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A carrier whose subscribers can be recharged.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MobileProvider {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    /// Local 3-digit prefixes (e.g. "098") owned by this carrier
    pub prefixes: Vec<String>,
    pub is_active: bool,
}

/// Side record written in the same unit of work as the recharge debit.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MobileRecharge {
    pub id: Uuid,
    pub account_id: Uuid,
    pub provider_id: Uuid,
    pub phone_number: String,
    pub amount: i64,
    pub transaction_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    pub provider_id: Uuid,
    pub phone_number: String,
    pub amount: i64,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RechargeResponse {
    pub success: bool,
    pub balance: i64,
    pub cashback: i64,
    pub recharge: MobileRecharge,
}
