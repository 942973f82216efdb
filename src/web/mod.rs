//! HTTP control surface
//!
//! JSON API for driving sessions, pushing camera frames and reading the
//! overlay layer, plus an SSE stream for live updates.

pub mod api;
pub mod routes;

use axum::Router;
use std::sync::Arc;

use crate::config::HttpConfig;
use crate::AppState;

/// Web server for the control API
pub struct WebServer {
    app_state: Arc<AppState>,
    config: HttpConfig,
}

impl WebServer {
    /// Create a new web server
    pub fn new(app_state: Arc<AppState>, config: &HttpConfig) -> Self {
        Self {
            app_state,
            config: config.clone(),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.app_state), &self.config)
    }

    /// Address the server binds to
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}
