//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: Database entity representing a customer's bank account
//! - `AccountSnapshot`: the locked subset of columns the balance mutator checks
//! - Request and response bodies for the account endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an account record from the database.
///
/// # Balance Storage
///
/// Balances are whole VND stored as `i64`. The `balance >= 0` and
/// `cashback_balance >= 0` invariants are also enforced by CHECK constraints.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,

    /// Owner of this account
    pub user_id: Uuid,

    /// 12-digit number printed on statements and encoded in payment QR codes
    pub account_number: String,

    pub balance: i64,

    /// Accrued cashback, redeemable into `balance` once above the threshold
    pub cashback_balance: i64,

    /// Maximum outgoing transfers and withdrawals per calendar day
    pub daily_limit: i64,

    /// Maximum outgoing transfers and withdrawals per calendar month
    pub monthly_limit: i64,

    /// A locked account rejects every balance-mutating operation
    pub is_locked: bool,

    /// Salted hash of the 6-digit PIN, if one was set
    pub pin_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Columns read under `FOR UPDATE` by the balance mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct AccountSnapshot {
    pub id: Uuid,
    pub balance: i64,
    pub is_locked: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLimitsRequest {
    pub daily_limit: i64,
    pub monthly_limit: i64,
}

/// Set or change the account PIN. `current_pin` is required when a PIN exists.
#[derive(Debug, Deserialize)]
pub struct SetPinRequest {
    pub current_pin: Option<String>,
    pub new_pin: String,
}

/// Body for unlocking an account; `pin` is required when the account has one.
#[derive(Debug, Default, Deserialize)]
pub struct UnlockRequest {
    pub pin: Option<String>,
}

/// Response body for account endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "account_number": "970412345678",
///   "balance": 100000,
///   "cashback_balance": 0,
///   "daily_limit": 100000000,
///   "monthly_limit": 1000000000,
///   "is_locked": false,
///   "has_pin": false,
///   "created_at": "2025-12-20T10:00:00Z",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub account_number: String,
    pub balance: i64,
    pub cashback_balance: i64,
    pub daily_limit: i64,
    pub monthly_limit: i64,
    pub is_locked: bool,
    pub has_pin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert database Account to API AccountResponse.
///
/// The PIN hash never leaves the service; clients only learn whether one is set.
impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_number: account.account_number,
            balance: account.balance,
            cashback_balance: account.cashback_balance,
            daily_limit: account.daily_limit,
            monthly_limit: account.monthly_limit,
            is_locked: account.is_locked,
            has_pin: account.pin_hash.is_some(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Returned when an account is opened.
#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub success: bool,
    pub account: AccountResponse,
    /// Welcome bonus credited, zero for every account after the first
    pub welcome_bonus: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
