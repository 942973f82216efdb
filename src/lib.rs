//! Formcoach - Headless exercise-tracking session controller
//!
//! Samples a live video feed, sends each frame to a remote pose-analysis
//! service and turns the replies into coaching feedback:
//! - Rep count, stage, joint angle and pose validity
//! - Debounced spoken cues (local TTS and/or browser via SSE)
//! - Mirrored skeleton overlay aligned to the video preview
//! - Automatic stop once a target rep count is reached

pub mod analysis;
pub mod capture;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod output;
pub mod overlay;
pub mod session;
pub mod voice;
pub mod web;

pub use config::Config;
pub use error::{FormcoachError, Result};

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

use capture::SharedFrameSource;
use error::SessionError;
use overlay::OverlayCanvas;
use session::{SessionPhase, SessionSnapshot};

/// Requests handled by the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start a session; `None` uses the configured default target
    Start { target_reps: Option<u32> },
    End,
}

/// A command plus an optional channel for the controller's verdict
#[derive(Debug)]
pub struct ControlRequest {
    pub command: SessionCommand,
    pub reply: Option<oneshot::Sender<std::result::Result<(), SessionError>>>,
}

/// Application state shared across all components
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Latest published session snapshot
    pub snapshot: RwLock<SessionSnapshot>,
    /// Channel for snapshot updates
    pub snapshot_tx: broadcast::Sender<SessionSnapshot>,
    /// Channel for spoken cues (forwarded to browser clients)
    pub speech_tx: broadcast::Sender<String>,
    /// Shutdown signal
    pub shutdown_tx: broadcast::Sender<()>,
    /// Most recent camera frame pushed by a client
    pub frames: Arc<SharedFrameSource>,
    /// Skeleton overlay layer
    pub overlay: RwLock<OverlayCanvas>,
    /// Control channel into the session controller
    commands: mpsc::Sender<ControlRequest>,
}

impl AppState {
    /// Create a new application state with the given configuration.
    ///
    /// The returned receiver belongs to the session controller.
    pub fn new(config: Config) -> (Arc<Self>, mpsc::Receiver<ControlRequest>) {
        let (snapshot_tx, _) = broadcast::channel(64);
        let (speech_tx, _) = broadcast::channel(16);
        let (shutdown_tx, _) = broadcast::channel(1);
        let (commands, commands_rx) = mpsc::channel(8);

        let overlay = OverlayCanvas::new(config.capture.width, config.capture.height, &config.overlay);

        let state = Arc::new(Self {
            config: RwLock::new(config),
            snapshot: RwLock::new(SessionSnapshot::default()),
            snapshot_tx,
            speech_tx,
            shutdown_tx,
            frames: Arc::new(SharedFrameSource::new()),
            overlay: RwLock::new(overlay),
            commands,
        });

        (state, commands_rx)
    }

    /// Store a snapshot and broadcast it
    pub async fn publish_snapshot(&self, snapshot: SessionSnapshot) {
        let mut current = self.snapshot.write().await;
        *current = snapshot.clone();
        let _ = self.snapshot_tx.send(snapshot);
    }

    /// Get the latest snapshot
    pub async fn get_snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Whether the last published snapshot shows an active session
    pub async fn is_session_active(&self) -> bool {
        self.snapshot.read().await.phase == SessionPhase::Active
    }

    /// Queue a command for the session controller without waiting for it
    pub async fn send_command(&self, command: SessionCommand) -> std::result::Result<(), SessionError> {
        self.commands
            .send(ControlRequest { command, reply: None })
            .await
            .map_err(|_| SessionError::ControllerGone)
    }

    /// Run a command through the session controller and return its verdict
    pub async fn request(&self, command: SessionCommand) -> std::result::Result<(), SessionError> {
        let (reply, verdict) = oneshot::channel();
        self.commands
            .send(ControlRequest {
                command,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SessionError::ControllerGone)?;
        verdict.await.map_err(|_| SessionError::ControllerGone)?
    }

    /// Subscribe to snapshot changes
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to spoken cues
    pub fn subscribe_speech(&self) -> broadcast::Receiver<String> {
        self.speech_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
