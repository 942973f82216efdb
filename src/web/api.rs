//! REST API endpoints

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::output::sse;
use crate::session::SessionSnapshot;
use crate::{AppState, SessionCommand};

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        })
    }

    pub fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            error: None,
        })
    }
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, ApiResponse::error(message)).into_response()
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub session: SessionSnapshot,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ApiResponse::success(StatusResponse {
        version: crate::VERSION.to_string(),
        session: state.get_snapshot().await,
    })
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().await;
    Json(config.clone())
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub target_reps: Option<u32>,
}

/// Start a session. The body is optional; a body that is sent must decode.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => StartRequest::default(),
        Err(rejection) => return reject(rejection.status(), &rejection.body_text()),
    };

    let outcome = state
        .request(SessionCommand::Start {
            target_reps: request.target_reps,
        })
        .await;
    command_response(outcome)
}

/// End the running session
pub async fn end_session(State(state): State<Arc<AppState>>) -> Response {
    command_response(state.request(SessionCommand::End).await)
}

/// Map the controller's verdict on a session command to a response
fn command_response(outcome: Result<(), SessionError>) -> Response {
    match outcome {
        Ok(()) => ApiResponse::ok().into_response(),
        Err(e @ (SessionError::AlreadyActive | SessionError::NotActive)) => {
            reject(StatusCode::CONFLICT, &e.to_string())
        }
        Err(e) => reject(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}

/// Replace the current camera frame with an encoded image (JPEG or PNG)
pub async fn push_frame(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    if body.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "Empty frame");
    }

    match image::load_from_memory(&body) {
        Ok(frame) => {
            debug!("Frame received: {}x{}", frame.width(), frame.height());
            state.frames.push(frame);
            ApiResponse::ok().into_response()
        }
        Err(e) => {
            warn!("Rejected frame: {}", e);
            reject(StatusCode::BAD_REQUEST, &format!("Undecodable frame: {}", e))
        }
    }
}

/// Current skeleton overlay as a transparent PNG
pub async fn overlay_png(State(state): State<Arc<AppState>>) -> Response {
    let png = state.overlay.read().await.to_png();
    match png {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// SSE stream for session updates
pub async fn session_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_session_stream(state)
}
