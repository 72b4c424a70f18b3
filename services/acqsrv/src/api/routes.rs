//! Route table for the control API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{handlers, ws, AppState};

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/engine/start", post(handlers::engine_start))
        .route("/engine/stop", post(handlers::engine_stop))
        .route("/nodes/{id}/reload", post(handlers::reload_node))
        .route("/devices/{id}/reconnect", post(handlers::reconnect_device))
        .route("/tags/{id}/write", post(handlers::write_tag))
        .route(
            "/settings/archive-interval",
            get(handlers::get_archive_interval).put(handlers::put_archive_interval),
        )
        .route("/api/health", get(handlers::health))
        .route("/events", get(ws::events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
