use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::application::handlers::signal_handler::{
    close_position, create_signal, get_balance, get_order, health_check, root, AppState,
};
use crate::rate_limit::{create_rate_limiter, rate_limit_middleware};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Assemble the HTTP surface with rate limiting, body limit, CORS and request tracing
pub fn build_router(state: AppState, requests_per_minute: u32) -> Router {
    let limiter = create_rate_limiter(requests_per_minute);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/signals", post(create_signal))
        .route("/signals/", post(create_signal))
        .route("/close", post(close_position))
        .route("/balance", get(get_balance))
        .route("/orders/:symbol/:order_id", get(get_order))
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
