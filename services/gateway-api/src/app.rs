//! Router and middleware stack

use axum::routing::{get, post};
use axum::Router;
use geoinfo_axum::{AuthLayer, CorsLayer};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers;
use crate::state::AppState;

/// Build the gateway router.
///
/// Every route except `/metrics` passes through CORS, authentication and
/// the authorization rules, in that order.
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::me))
        .route("/api/auth/password", post(handlers::change_password))
        .route("/api/health", get(handlers::health))
        .fallback(handlers::not_found);

    // Metrics route (outside the policy)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS before authentication so preflights never need a token
        .layer(CorsLayer::new(state.cors()))
        .layer(AuthLayer::new(state.tokens(), state.policy()))
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    metrics_route.merge(api.layer(middleware).with_state(state))
}
