//! Derived per-session state, recomputed from each analysis result

use serde::{Deserialize, Serialize};

use super::{NEUTRAL_STAGE, REFRAME_PROMPT, TRACKING_PLACEHOLDER};
use crate::analysis::AnalysisResult;
use crate::overlay::OverlayCommand;

/// Whether the current pose is usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedState {
    /// Never decreases within a session
    pub rep_count: u32,
    pub stage: String,
    pub angle: f64,
    pub validity: Validity,
    pub feedback: String,
    pub guidance: String,
    /// Consecutive results carrying the "no person" warning
    pub no_person_streak: u32,
}

impl Default for DerivedState {
    fn default() -> Self {
        Self {
            rep_count: 0,
            stage: NEUTRAL_STAGE.to_string(),
            angle: 0.0,
            validity: Validity::Unknown,
            feedback: String::new(),
            guidance: String::new(),
            no_person_streak: 0,
        }
    }
}

impl DerivedState {
    /// Fold one result into the state and return the overlay action.
    ///
    /// `no_person_tolerance` is how many consecutive "no person" results are
    /// absorbed before the pose is marked invalid.
    pub fn apply(&mut self, result: &AnalysisResult, no_person_tolerance: u32) -> OverlayCommand {
        if let Some(reps) = result.reported_reps() {
            self.rep_count = self.rep_count.max(reps);
        }

        self.stage = result.stage_label().unwrap_or(NEUTRAL_STAGE).to_string();
        self.angle = result.angle.filter(|a| a.is_finite()).unwrap_or(0.0);
        self.guidance = result.guidance.clone().unwrap_or_default();

        if result.is_no_person() {
            self.no_person_streak = self.no_person_streak.saturating_add(1);
            if self.no_person_streak > no_person_tolerance {
                self.validity = Validity::Invalid;
                self.feedback = REFRAME_PROMPT.to_string();
            }
        } else {
            self.no_person_streak = 0;
            self.validity = Validity::Valid;
            self.feedback = result
                .feedback
                .clone()
                .unwrap_or_else(|| TRACKING_PLACEHOLDER.to_string());
        }

        match result.drawable_landmarks() {
            Some(points) => OverlayCommand::Draw(points.to_vec()),
            None => OverlayCommand::Clear,
        }
    }
}
