//! Route definitions for the control API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::AppState;

use super::api;

/// Create the main router with all routes
pub fn create_router(app_state: Arc<AppState>, config: &HttpConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/config", get(api::get_config))
        // Session control
        .route("/api/session/start", post(api::start_session))
        .route("/api/session/end", post(api::end_session))
        // Video input and overlay output
        .route("/api/frame", post(api::push_frame))
        .route("/api/overlay.png", get(api::overlay_png))
        // SSE stream for live clients
        .route("/api/stream", get(api::session_stream))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
