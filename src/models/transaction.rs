//! Ledger entry data models and API request/response types.
//!
//! This module defines:
//! - `TransactionKind` / `TransactionStatus`: closed enums mapped to Postgres enum types
//! - `Transaction`: an appended ledger row
//! - `NewEntry`: a ledger entry draft handed to the balance mutator
//! - Request and response bodies for the money-moving endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Kind of balance-affecting event.
///
/// Each kind has a fixed direction, which fixes which account references a
/// ledger row of that kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
    BillPayment,
    SavingsDeposit,
    SavingsWithdraw,
    PiggyDeposit,
    PiggyWithdraw,
    MobileRecharge,
    CashbackRedeem,
}

/// Which ends of a ledger row are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Money enters the bank's books: only `to_account_id`.
    Credit,
    /// Money leaves the bank's books: only `from_account_id`.
    Debit,
    /// Money moves between two accounts: both ends.
    Transfer,
}

impl TransactionKind {
    pub fn direction(self) -> Direction {
        match self {
            TransactionKind::Deposit
            | TransactionKind::SavingsWithdraw
            | TransactionKind::PiggyWithdraw
            | TransactionKind::CashbackRedeem => Direction::Credit,
            TransactionKind::Withdraw
            | TransactionKind::BillPayment
            | TransactionKind::SavingsDeposit
            | TransactionKind::PiggyDeposit
            | TransactionKind::MobileRecharge => Direction::Debit,
            TransactionKind::Transfer => Direction::Transfer,
        }
    }
}

/// Ledger row status. Every committed row is a success; failures never reach the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
}

/// Represents a ledger row from the `transactions` table.
///
/// Rows are append-only: nothing in the service updates or deletes them.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,

    pub transaction_type: TransactionKind,

    pub status: TransactionStatus,

    /// Positive magnitude of the movement in VND
    pub amount: i64,

    /// Fee charged on top of `amount` to the source account
    pub fee: i64,

    pub description: Option<String>,

    /// Source account (debit and transfer kinds)
    pub from_account_id: Option<Uuid>,

    /// Destination account (credit and transfer kinds)
    pub to_account_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// A ledger entry that has not been written yet.
///
/// Built through [`NewEntry::credit`], [`NewEntry::debit`] or [`NewEntry::transfer`]
/// and checked with [`NewEntry::validate`] before the mutator touches any row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub kind: TransactionKind,
    pub amount: i64,
    pub fee: i64,
    pub description: Option<String>,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
}

impl NewEntry {
    pub fn credit(kind: TransactionKind, to: Uuid, amount: i64) -> Self {
        Self {
            kind,
            amount,
            fee: 0,
            description: None,
            from_account_id: None,
            to_account_id: Some(to),
        }
    }

    pub fn debit(kind: TransactionKind, from: Uuid, amount: i64) -> Self {
        Self {
            kind,
            amount,
            fee: 0,
            description: None,
            from_account_id: Some(from),
            to_account_id: None,
        }
    }

    pub fn transfer(from: Uuid, to: Uuid, amount: i64) -> Self {
        Self {
            kind: TransactionKind::Transfer,
            amount,
            fee: 0,
            description: None,
            from_account_id: Some(from),
            to_account_id: Some(to),
        }
    }

    pub fn with_fee(mut self, fee: i64) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Check that the populated ends match the kind's direction and the amounts are sane.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount <= 0 {
            return Err(AppError::validation("Amount must be positive"));
        }
        if self.fee < 0 {
            return Err(AppError::validation("Fee cannot be negative"));
        }

        match (
            self.kind.direction(),
            self.from_account_id,
            self.to_account_id,
        ) {
            (Direction::Credit, None, Some(_)) | (Direction::Debit, Some(_), None) => Ok(()),
            (Direction::Transfer, Some(from), Some(to)) if from == to => Err(
                AppError::precondition("Cannot transfer to the same account"),
            ),
            (Direction::Transfer, Some(_), Some(_)) => Ok(()),
            _ => Err(AppError::validation(format!(
                "Ledger entry of kind {:?} has the wrong account references",
                self.kind
            ))),
        }
    }
}

/// Request to transfer money to another customer.
///
/// `recipient` is either a 12-digit account number (what a payment QR code
/// carries) or a username.
///
/// # JSON Example
///
/// ```json
/// {
///   "recipient": "970412345678",
///   "amount": 100000,
///   "message": "Lunch",
///   "pin": "123456"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: i64,
    pub message: Option<String>,
    /// Source account; the caller's primary account when absent
    pub account_id: Option<Uuid>,
    /// Required when the source account has a PIN
    pub pin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub success: bool,
    pub message: String,
    pub new_balance: i64,
    pub fee: i64,
    pub transaction_id: Uuid,
}

/// Request to put cash into an account (counter deposit or ATM top-up).
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: i64,
    pub description: Option<String>,
    pub account_id: Option<Uuid>,
    /// Branch or ATM where the cash was handed in
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub success: bool,
    pub balance: i64,
    pub transaction_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: i64,
    pub description: Option<String>,
    pub account_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub pin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub success: bool,
    pub balance: i64,
    pub fee: i64,
    pub transaction_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PayBillRequest {
    pub provider_id: Uuid,
    pub customer_code: String,
    pub amount: i64,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PayBillResponse {
    pub success: bool,
    pub message: String,
    pub balance: i64,
    pub cashback: i64,
    pub transaction_id: Uuid,
}

/// Query parameters for the history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub account_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// Response returned for ledger rows.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub transaction_type: TransactionKind,
    pub status: TransactionStatus,
    pub amount: i64,
    pub fee: i64,
    pub description: Option<String>,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            transaction_type: transaction.transaction_type,
            status: transaction.status,
            amount: transaction.amount,
            fee: transaction.fee,
            description: transaction.description,
            from_account_id: transaction.from_account_id,
            to_account_id: transaction.to_account_id,
            created_at: transaction.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_entries_only_reference_destination() {
        let to = Uuid::new_v4();
        let entry = NewEntry::credit(TransactionKind::Deposit, to, 10_000);

        assert!(entry.validate().is_ok());
        assert_eq!(entry.from_account_id, None);
        assert_eq!(entry.to_account_id, Some(to));
    }

    #[test]
    fn debit_kind_with_destination_is_rejected() {
        let mut entry = NewEntry::debit(TransactionKind::Withdraw, Uuid::new_v4(), 50_000);
        entry.to_account_id = Some(Uuid::new_v4());

        assert!(matches!(entry.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn credit_kind_built_as_debit_is_rejected() {
        let entry = NewEntry::debit(TransactionKind::Deposit, Uuid::new_v4(), 50_000);

        assert!(matches!(entry.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn transfer_to_same_account_is_rejected() {
        let id = Uuid::new_v4();
        let entry = NewEntry::transfer(id, id, 1_000);

        assert!(matches!(entry.validate(), Err(AppError::Precondition(_))));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let entry = NewEntry::credit(TransactionKind::Deposit, Uuid::new_v4(), 0);

        assert!(matches!(entry.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn every_kind_has_a_direction() {
        assert_eq!(TransactionKind::Transfer.direction(), Direction::Transfer);
        assert_eq!(TransactionKind::CashbackRedeem.direction(), Direction::Credit);
        assert_eq!(TransactionKind::MobileRecharge.direction(), Direction::Debit);
    }

    #[test]
    fn kinds_serialize_in_ledger_spelling() {
        let json = serde_json::to_string(&TransactionKind::BillPayment).unwrap();
        assert_eq!(json, "\"BILL_PAYMENT\"");
    }
}
