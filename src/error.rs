//! Error types for Formcoach

use thiserror::Error;

/// Main error type for Formcoach
#[derive(Error, Debug)]
pub enum FormcoachError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Frame capture and encoding errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Failures talking to the remote pose-analysis service.
///
/// Every variant is treated as a transient, per-tick failure.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Analysis service returned {0}")]
    Status(u16),

    #[error("Malformed analysis response: {0}")]
    Decode(String),

    #[error("Analysis task aborted: {0}")]
    Aborted(String),
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A session is already active")]
    AlreadyActive,

    #[error("No session is active")]
    NotActive,

    #[error("Session controller is not running")]
    ControllerGone,

    #[error("Session service request failed: {0}")]
    Service(String),
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Overlay rendering failed: {0}")]
    Overlay(String),
}

/// Result type alias for Formcoach operations
pub type Result<T> = std::result::Result<T, FormcoachError>;
