//! Data models representing database entities and API bodies.

/// Bank account model
pub mod account;
pub mod card;
pub mod cashback;
pub mod directory;
pub mod mobile;
pub mod piggy_bank;
pub mod savings;
/// Ledger entry model
pub mod transaction;
pub mod user;

use serde::Serialize;

/// `{"success": true, "data": ...}` for reads and updates that hand back a
/// resource or a list as-is.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
