//! Configuration parsing and management for Formcoach

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, FormcoachError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub capture: CaptureConfig,
    pub analysis: AnalysisConfig,
    pub session_service: SessionServiceConfig,
    pub voice: VoiceConfig,
    pub overlay: OverlayConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FormcoachError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, FormcoachError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, FormcoachError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FormcoachError> {
        if self.session.sample_interval_ms == 0 {
            return Err(invalid(
                "session.sample_interval_ms",
                "Sample interval must be greater than 0",
            ));
        }

        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(invalid(
                "capture.width/height",
                "Capture resolution must be non-zero",
            ));
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(invalid(
                "capture.jpeg_quality",
                "JPEG quality must be between 1 and 100",
            ));
        }

        if self.analysis.url.is_empty() {
            return Err(invalid("analysis.url", "Analysis endpoint is required"));
        }

        if self.voice.enabled {
            if let Some(ref cmd) = self.voice.command {
                if cmd.trim().is_empty() {
                    tracing::warn!("voice.command is set but empty, spoken cues go to SSE only");
                }
            }
        }

        if self.http.port == 0 {
            return Err(invalid("http.port", "Port must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> FormcoachError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Session pacing and auto-stop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sample-analyze-render cadence in milliseconds
    pub sample_interval_ms: u64,
    /// Target used when a start request carries none (0 disables auto-stop)
    pub default_target_reps: u32,
    /// Consecutive "no person" results tolerated before marking the pose invalid
    pub no_person_tolerance: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 800,
            default_target_reps: 0,
            no_person_tolerance: 2,
        }
    }
}

/// Frame downsizing and re-encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target width of the encoded payload
    pub width: u32,
    /// Target height of the encoded payload
    pub height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            jpeg_quality: 60,
        }
    }
}

/// Remote pose-analysis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Full URL of the analyze endpoint
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/analyze".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Remote session bookkeeping service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionServiceConfig {
    /// Notify the remote service of session start/end
    pub enabled: bool,
    /// Base URL; `/session/start` and `/session/end` are appended
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SessionServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 3000,
        }
    }
}

/// Spoken coaching cues
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Enable spoken cues
    pub enabled: bool,
    /// Minimum gap before repeating the "move into frame" prompt
    pub no_person_cooldown_secs: u64,
    /// Optional local TTS program (e.g. "espeak"); text is passed as the last argument
    pub command: Option<String>,
    /// Extra arguments passed before the text
    pub args: Vec<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            no_person_cooldown_secs: 5,
            command: None,
            args: Vec::new(),
        }
    }
}

/// Skeleton overlay styling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Landmark marker radius in pixels
    pub point_radius: i32,
    /// Connection line thickness in pixels
    pub line_thickness: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            point_radius: 5,
            line_thickness: 3,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable HTTP server
    pub enabled: bool,
    /// HTTP server host
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("formcoach");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/formcoach");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/formcoach");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("formcoach");
        }
    }

    PathBuf::from(".")
}
