//! Read-only reference data: bill providers and deposit locations.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BillProvider {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    /// ELECTRICITY, WATER, INTERNET, TELEVISION
    pub category: String,
    pub is_active: bool,
}

/// A branch or ATM where cash can be deposited or withdrawn.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DepositLocation {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub kind: String,
    pub is_active: bool,
}
