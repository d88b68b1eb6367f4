//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and balance mutations.

pub mod account_service;
pub mod account_store;
pub mod auth_service;
pub mod card_service;
pub mod cashback_service;
pub mod ledger;
pub mod piggy_bank_service;
pub mod policy;
pub mod recharge_service;
pub mod savings_service;
pub mod security;
pub mod transaction_service;

#[cfg(test)]
mod scenarios;
