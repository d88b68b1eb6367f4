//! HTTP middleware components.

/// Session authentication middleware
pub mod auth;
