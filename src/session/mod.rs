//! Session state machine
//!
//! [`SessionMachine`] owns everything that survives across ticks: the
//! lifecycle, the derived state, and the voice debouncer. Each tick handler
//! takes it by `&mut`, so the whole machine can be driven without timers.

pub mod lifecycle;
pub mod state;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::AnalysisResult;
use crate::clock::Clock;
use crate::config::{SessionConfig, VoiceConfig};
use crate::error::{AnalysisError, SessionError};
use crate::overlay::OverlayCommand;
use crate::voice::{Speaker, VoiceDebouncer};

pub use lifecycle::{Session, SessionPhase};
pub use state::{DerivedState, Validity};

/// Stage shown when the service reports none
pub const NEUTRAL_STAGE: &str = "-";

/// Feedback shown when a visible person's result carries no feedback text
pub const TRACKING_PLACEHOLDER: &str = "Tracking…";

/// Feedback once the "no person" tolerance is exceeded
pub const REFRAME_PROMPT: &str = "Step back so your whole upper body is in view";

/// Banner for a failed analysis tick
pub const SERVER_BUSY: &str = "Server busy, retrying…";

/// Side effects of one applied analysis result
#[derive(Debug, Clone, PartialEq)]
pub struct TickEffects {
    pub overlay: OverlayCommand,
    /// Messages handed to the speaker this tick
    pub spoken: Vec<String>,
    /// The target was reached; the caller must end the session
    pub end_requested: bool,
}

/// Serializable view of the machine for the UI and SSE stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub elapsed_secs: u64,
    pub target_reps: u32,
    #[serde(flatten)]
    pub state: DerivedState,
    /// Transient error banner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::NotStarted,
            elapsed_secs: 0,
            target_reps: 0,
            state: DerivedState::default(),
            message: None,
        }
    }
}

/// Logged when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub elapsed_secs: u64,
    pub rep_count: u32,
    pub target_reps: u32,
    pub auto_ended: bool,
}

pub struct SessionMachine {
    session: Session,
    state: DerivedState,
    voice: VoiceDebouncer,
    banner: Option<String>,
    no_person_tolerance: u32,
    no_person_cooldown: Duration,
    speaker: Arc<dyn Speaker>,
    clock: Arc<dyn Clock>,
}

impl SessionMachine {
    pub fn new(
        session_config: &SessionConfig,
        voice_config: &VoiceConfig,
        speaker: Arc<dyn Speaker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let no_person_cooldown = Duration::from_secs(voice_config.no_person_cooldown_secs);
        Self {
            session: Session::new(),
            state: DerivedState::default(),
            voice: VoiceDebouncer::new(no_person_cooldown),
            banner: None,
            no_person_tolerance: session_config.no_person_tolerance,
            no_person_cooldown,
            speaker,
            clock,
        }
    }

    /// Start a session; returns its generation
    pub fn start(&mut self, target_reps: u32) -> Result<u64, SessionError> {
        let generation = self.session.start(target_reps)?;
        self.state = DerivedState::default();
        self.voice = VoiceDebouncer::new(self.no_person_cooldown);
        self.banner = None;
        tracing::info!("Session {} started (target reps: {})", generation, target_reps);
        Ok(generation)
    }

    /// End the active session
    pub fn end(&mut self) -> Result<SessionSummary, SessionError> {
        self.session.end()?;
        self.banner = None;

        let summary = SessionSummary {
            elapsed_secs: self.session.elapsed_secs(),
            rep_count: self.state.rep_count,
            target_reps: self.session.target_reps(),
            auto_ended: self.session.auto_ended(),
        };
        tracing::info!(
            "Session {} ended: {} reps in {}s (target {}, auto: {})",
            self.session.generation(),
            summary.rep_count,
            summary.elapsed_secs,
            summary.target_reps,
            summary.auto_ended
        );
        Ok(summary)
    }

    pub fn tick_second(&mut self) {
        self.session.tick_second();
    }

    /// Apply a result produced for `generation`.
    ///
    /// Returns `None` when the result is stale: the session it belongs to has
    /// ended or been replaced.
    pub fn apply_result(&mut self, generation: u64, result: &AnalysisResult) -> Option<TickEffects> {
        if !self.session.is_current(generation) {
            tracing::debug!(
                "Discarding analysis result for session {} (current {}, {})",
                generation,
                self.session.generation(),
                self.session.phase()
            );
            return None;
        }

        self.banner = None;
        let overlay = self.state.apply(result, self.no_person_tolerance);

        let now = self.clock.now();
        let mut spoken = Vec::new();
        if let Some(message) = self.voice.select(result, now) {
            self.say(message, &mut spoken);
        }

        let end_requested = self.session.claim_auto_stop(self.state.rep_count);
        if end_requested {
            tracing::info!(
                "Target of {} reps reached, stopping session",
                self.session.target_reps()
            );
            let done = format!(
                "Great work! You finished {} reps.",
                self.session.target_reps()
            );
            if let Some(message) = self.voice.announce(done, now) {
                self.say(message, &mut spoken);
            }
        }

        Some(TickEffects {
            overlay,
            spoken,
            end_requested,
        })
    }

    /// Record a failed analysis tick. Only the banner changes.
    pub fn apply_failure(&mut self, generation: u64, error: &AnalysisError) -> bool {
        if !self.session.is_current(generation) {
            return false;
        }
        tracing::warn!("Analysis failed: {}", error);
        self.banner = Some(SERVER_BUSY.to_string());
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.session.phase(),
            elapsed_secs: self.session.elapsed_secs(),
            target_reps: self.session.target_reps(),
            state: self.state.clone(),
            message: self.banner.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn generation(&self) -> u64 {
        self.session.generation()
    }

    pub fn state(&self) -> &DerivedState {
        &self.state
    }

    fn say(&self, message: String, spoken: &mut Vec<String>) {
        tracing::debug!("Speaking: {}", message);
        self.speaker.speak(&message);
        spoken.push(message);
    }
}
