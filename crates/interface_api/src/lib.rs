//! HTTP API Layer
//!
//! REST surface of the back-office core, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource (invoices, payables, receivables,
//!   provisions, equity, reports, monthly close)
//! - **Middleware**: bearer-token authentication and request audit logging
//! - **DTOs**: validated request bodies and query parameters
//! - **Error Handling**: every domain error maps to one HTTP status
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState, Stores};
//!
//! let state = AppState::new(config, Stores::postgres(pool))?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{close, equity, health, invoices, payables, provisions, receivables, reports};
use crate::middleware::{auth_middleware, request_log_middleware};

pub use state::{AppState, Stores};

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice).get(invoices::list_invoices))
        .route("/:id", get(invoices::get_invoice))
        .route("/:id/lines", put(invoices::update_lines))
        .route("/:id/status", post(invoices::transition_status))
        .route("/:id/payments", post(invoices::record_payment))
        .route("/:id/cancel", post(invoices::cancel_invoice));

    let payable_routes = Router::new()
        .route("/", post(payables::create_payable).get(payables::list_payables))
        .route("/:id", get(payables::get_payable))
        .route("/:id/settlements", post(payables::record_settlement))
        .route("/:id/cancel", post(payables::cancel_payable));

    let receivable_routes = Router::new()
        .route("/", post(receivables::create_receivable).get(receivables::list_receivables))
        .route("/flagged", get(receivables::list_flagged))
        .route("/:id", get(receivables::get_receivable))
        .route("/:id/settlements", post(receivables::record_settlement))
        .route("/:id/cancel", post(receivables::cancel_receivable))
        .route("/:id/clear-flag", post(receivables::clear_review_flag));

    let provision_routes = Router::new()
        .route("/", post(provisions::create_provision).get(provisions::list_provisions))
        .route("/:id", get(provisions::get_provision))
        .route("/:id/reverse", post(provisions::reverse_provision))
        .route("/:id/supersede", post(provisions::supersede_provision));

    let equity_routes = Router::new()
        .route("/", post(equity::record_equity_entry).get(equity::list_equity_entries));

    let report_routes = Router::new()
        .route("/aging", get(reports::aging))
        .route("/profit-and-loss", get(reports::profit_and_loss))
        .route("/balance-sheet", get(reports::balance_sheet))
        .route("/cash-flow", get(reports::cash_flow));

    let close_routes = Router::new()
        .route("/", get(close::closed_periods))
        .route(
            "/:year_month",
            get(close::summarize_month)
                .post(close::close_month)
                .delete(close::reopen_month),
        );

    // Protected API routes
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/payables", payable_routes)
        .nest("/receivables", receivable_routes)
        .nest("/provisions", provision_routes)
        .nest("/equity", equity_routes)
        .nest("/reports", report_routes)
        .nest("/close", close_routes)
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
