//! HTTP request handlers (route handlers).
//!
//! Each handler extracts the caller identity and request body, delegates to a
//! service, and shapes the service outcome into a `{"success": true, ...}` body.

/// Account management endpoints
pub mod accounts;
pub mod auth;
pub mod cards;
pub mod cashback;
pub mod directory;
pub mod health;
pub mod piggy_banks;
pub mod recharges;
pub mod savings;
/// Transfers, deposits, withdrawals, bills and history
pub mod transactions;
