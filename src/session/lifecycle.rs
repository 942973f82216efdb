//! Session lifecycle: NotStarted -> Active -> Ended, and back to Active only
//! through a new start

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Active,
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::NotStarted => write!(f, "not started"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Ended => write!(f, "ended"),
        }
    }
}

/// One bounded exercise-tracking interaction
#[derive(Debug, Clone, Default)]
pub struct Session {
    phase: SessionPhase,
    elapsed_secs: u64,
    /// 0 disables auto-stop
    target_reps: u32,
    auto_ended: bool,
    /// Bumped on every start; tags in-flight work so late replies can be told apart
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, resetting per-session counters
    pub fn start(&mut self, target_reps: u32) -> Result<u64, SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }

        self.generation += 1;
        self.phase = SessionPhase::Active;
        self.elapsed_secs = 0;
        self.target_reps = target_reps;
        self.auto_ended = false;
        Ok(self.generation)
    }

    pub fn end(&mut self) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }
        self.phase = SessionPhase::Ended;
        Ok(())
    }

    /// Advance the elapsed-seconds counter (no-op unless active)
    pub fn tick_second(&mut self) {
        if self.is_active() {
            self.elapsed_secs += 1;
        }
    }

    /// Returns true exactly once per session, the first time `reps` reaches
    /// a positive target. The flag is set here, before any end call is issued.
    pub fn claim_auto_stop(&mut self, reps: u32) -> bool {
        if !self.is_active() || self.auto_ended || self.target_reps == 0 {
            return false;
        }
        if reps >= self.target_reps {
            self.auto_ended = true;
            return true;
        }
        false
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// True when `generation` belongs to the running session
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_active() && self.generation == generation
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn target_reps(&self) -> u32 {
        self.target_reps
    }

    pub fn auto_ended(&self) -> bool {
        self.auto_ended
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
