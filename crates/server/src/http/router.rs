//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// The ingress decrypt filter wraps every route, including the fallback.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/collections/:collection/documents",
            post(handlers::create).get(handlers::list),
        )
        .route(
            "/collections/:collection/documents/:id",
            get(handlers::fetch)
                .patch(handlers::update)
                .delete(handlers::remove),
        )
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::decrypt_request_body))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
