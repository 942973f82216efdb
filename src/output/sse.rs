//! Server-Sent Events for real-time session updates

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::session::SessionSnapshot;
use crate::AppState;

/// Create an SSE stream carrying `snapshot` and `speak` events
pub fn create_session_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let snapshots = BroadcastStream::new(app_state.subscribe_snapshots()).filter_map(|result| {
        match result {
            Ok(snapshot) => Some(Ok(snapshot_to_event(&snapshot))),
            Err(_) => None, // Skip lagged messages
        }
    });

    let speech = BroadcastStream::new(app_state.subscribe_speech()).filter_map(|result| {
        match result {
            Ok(text) => Some(Ok(speech_to_event(&text))),
            Err(_) => None,
        }
    });

    Sse::new(snapshots.merge(speech)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert a session snapshot to an SSE event
fn snapshot_to_event(snapshot: &SessionSnapshot) -> Event {
    let data = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("snapshot").data(data)
}

/// Convert a spoken cue to an SSE event
fn speech_to_event(text: &str) -> Event {
    let data = serde_json::json!({ "text": text });
    Event::default().event("speak").data(data.to_string())
}
