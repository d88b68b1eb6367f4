//! HTTP routing table.

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// Public routes: health, register/login/logout and the directory listings.
/// Everything else sits behind the session guard.
pub fn router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        .route("/api/v1/me", get(handlers::auth::me))
        // Accounts
        .route(
            "/api/v1/accounts",
            get(handlers::accounts::list_accounts).post(handlers::accounts::create_account),
        )
        .route("/api/v1/accounts/{id}", get(handlers::accounts::get_account))
        .route(
            "/api/v1/accounts/{id}/lock",
            post(handlers::accounts::lock_account),
        )
        .route(
            "/api/v1/accounts/{id}/unlock",
            post(handlers::accounts::unlock_account),
        )
        .route(
            "/api/v1/accounts/{id}/limits",
            put(handlers::accounts::update_limits),
        )
        .route("/api/v1/accounts/{id}/pin", put(handlers::accounts::set_pin))
        // Money movement
        .route(
            "/api/v1/transfers",
            post(handlers::transactions::create_transfer),
        )
        .route(
            "/api/v1/deposits",
            post(handlers::transactions::create_deposit),
        )
        .route(
            "/api/v1/withdrawals",
            post(handlers::transactions::create_withdrawal),
        )
        .route("/api/v1/bills/pay", post(handlers::transactions::pay_bill))
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        // Savings and piggy banks
        .route(
            "/api/v1/savings",
            get(handlers::savings::list_savings).post(handlers::savings::create_savings),
        )
        .route(
            "/api/v1/savings/{id}/withdraw",
            post(handlers::savings::withdraw_savings),
        )
        .route(
            "/api/v1/piggy-banks",
            get(handlers::piggy_banks::list_piggy_banks)
                .post(handlers::piggy_banks::create_piggy_bank),
        )
        .route(
            "/api/v1/piggy-banks/{id}/deposit",
            post(handlers::piggy_banks::deposit),
        )
        .route(
            "/api/v1/piggy-banks/{id}/withdraw",
            post(handlers::piggy_banks::withdraw),
        )
        // Recharge and cashback
        .route(
            "/api/v1/mobile-recharges",
            post(handlers::recharges::create_recharge),
        )
        .route("/api/v1/cashback", get(handlers::cashback::get_cashback))
        .route(
            "/api/v1/cashback/redeem",
            post(handlers::cashback::redeem_cashback),
        )
        // Cards
        .route(
            "/api/v1/cards",
            get(handlers::cards::list_cards).post(handlers::cards::issue_card),
        )
        .route("/api/v1/cards/{id}/lock", post(handlers::cards::lock_card))
        .route(
            "/api/v1/cards/{id}/unlock",
            post(handlers::cards::unlock_card),
        )
        .route(
            "/api/v1/cards/{id}/settings",
            put(handlers::cards::update_settings),
        )
        // Apply the session guard to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/v1/mobile-providers",
            get(handlers::directory::list_mobile_providers),
        )
        .route(
            "/api/v1/bill-providers",
            get(handlers::directory::list_bill_providers),
        )
        .route(
            "/api/v1/deposit-locations",
            get(handlers::directory::list_deposit_locations),
        )
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(state.config.cors_origin.as_deref()) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

/// CORS for the browser front end. Cookies are sent, so the origin must be explicit.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    let origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(%origin, error = %e, "ignoring invalid CORS_ORIGIN");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}
