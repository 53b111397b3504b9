//! Tiffin Subscription API
//!
//! REST front of the subscription lifecycle manager.
//!
//! ## Customer, vendor and admin endpoints (bearer session)
//!
//! - `POST /api/v1/checkout` - Price a plan or trial and open a gateway order
//! - `POST /api/v1/subscriptions` - Subscribe after payment
//! - `POST /api/v1/trials` - Start a trial
//! - `GET /api/v1/subscriptions/{id}` - Subscription with its orders
//! - `POST /api/v1/subscriptions/{id}/pause` - Pause
//! - `POST /api/v1/subscriptions/{id}/resume` - Resume
//! - `POST /api/v1/subscriptions/{id}/cancel` - Cancel with refund or credit
//! - `POST /api/v1/subscriptions/{id}/skip` - Skip one meal
//! - `POST /api/v1/subscriptions/{id}/convert` - Convert a trial to a plan
//! - `GET /api/v1/credits` - Credit balance and history
//! - `POST /api/v1/orders/{id}/outcome` - Record an order outcome
//! - `POST /api/v1/admin/plans`, `PUT /api/v1/admin/plans/{id}`,
//!   `POST /api/v1/admin/plans/{id}/deactivate`
//! - `GET|PUT /api/v1/admin/settings`
//! - `POST /api/v1/admin/trial-types`, `PUT /api/v1/admin/trial-types/{id}`
//!
//! ## Scheduler endpoints (`X-Internal-Token`)
//!
//! - `POST /internal/renewals/{id}/quote`, `POST /internal/renewals/{id}`
//! - `POST /internal/subscriptions/{id}/expire`
//! - `POST /internal/pauses/sweep`
//! - `POST /internal/credits/expire`
//!
//! ## Webhooks, health and metrics
//!
//! - `POST /webhooks/razorpay` - Razorpay payment events
//! - `GET /health`, `GET /ready`, `GET /metrics`

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers::{health, ready};
use crate::state::AppState;

/// Build the HTTP router with the full middleware stack
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api_v1 = Router::new()
        // Purchase
        .route("/checkout", post(handlers::create_checkout))
        .route("/subscriptions", post(handlers::subscribe))
        .route("/trials", post(handlers::start_trial))
        // Lifecycle
        .route("/subscriptions/{id}", get(handlers::get_subscription))
        .route("/subscriptions/{id}/pause", post(handlers::pause))
        .route("/subscriptions/{id}/resume", post(handlers::resume))
        .route("/subscriptions/{id}/cancel", post(handlers::cancel))
        .route("/subscriptions/{id}/skip", post(handlers::skip))
        .route("/subscriptions/{id}/convert", post(handlers::convert_trial))
        // Credits and orders
        .route("/credits", get(handlers::list_credits))
        .route("/orders/{id}/outcome", post(handlers::mark_order))
        // Catalog
        .route("/admin/plans", post(handlers::create_plan))
        .route("/admin/plans/{id}", put(handlers::update_plan))
        .route("/admin/plans/{id}/deactivate", post(handlers::deactivate_plan))
        .route(
            "/admin/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/admin/trial-types", post(handlers::create_trial_type))
        .route("/admin/trial-types/{id}", put(handlers::update_trial_type));

    // Scheduler routes
    let internal = Router::new()
        .route("/renewals/{id}/quote", post(handlers::quote_renewal))
        .route("/renewals/{id}", post(handlers::renew))
        .route("/subscriptions/{id}/expire", post(handlers::expire))
        .route("/pauses/sweep", post(handlers::sweep_pauses))
        .route("/credits/expire", post(handlers::expire_credits));

    // Webhook route (separate - uses raw body, no JSON parsing)
    let webhook_routes =
        Router::new().route("/webhooks/razorpay", post(handlers::razorpay_webhook));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .nest("/internal", internal)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
