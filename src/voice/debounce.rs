//! Voice feedback debouncer
//!
//! At most one utterance per analysis tick. Candidates are checked in a fixed
//! order and the last matching check wins:
//!
//! 1. "no person" warning with the cooldown elapsed since the last utterance
//! 2. rep-completed event with a count above the last announced rep
//! 3. stage change to a non-neutral stage
//!
//! A candidate is spoken only if it differs from the previous utterance.

use std::time::{Duration, Instant};

use crate::analysis::AnalysisResult;
use crate::session::NEUTRAL_STAGE;

/// Prompt spoken when nobody is visible
pub const MOVE_INTO_FRAME_PROMPT: &str = "Please move into the frame";

#[derive(Debug, Clone)]
pub struct VoiceDebouncer {
    /// Last spoken message; empty until something is spoken
    last_message: String,
    last_spoken_at: Option<Instant>,
    last_stage: String,
    last_rep: u32,
    no_person_cooldown: Duration,
}

impl VoiceDebouncer {
    pub fn new(no_person_cooldown: Duration) -> Self {
        Self {
            last_message: String::new(),
            last_spoken_at: None,
            last_stage: NEUTRAL_STAGE.to_string(),
            last_rep: 0,
            no_person_cooldown,
        }
    }

    /// Pick the message to speak for this result, if any.
    ///
    /// The returned message has already been recorded as spoken.
    pub fn select(&mut self, result: &AnalysisResult, now: Instant) -> Option<String> {
        let mut candidate = None;

        if result.is_no_person() && self.cooldown_elapsed(now) {
            candidate = Some(MOVE_INTO_FRAME_PROMPT.to_string());
        }

        if result.is_rep_completed() {
            if let Some(reps) = result.reported_reps() {
                if reps > self.last_rep {
                    self.last_rep = reps;
                    candidate = Some(format!("Rep {} completed", reps));
                }
            }
        }

        let stage = result.stage_label().unwrap_or(NEUTRAL_STAGE);
        if stage != self.last_stage && stage != NEUTRAL_STAGE {
            self.last_stage = stage.to_string();
            candidate = Some(stage.to_string());
        }

        candidate.and_then(|message| self.commit(message, now))
    }

    /// Speak an out-of-band message (e.g. session completion) through the
    /// same repeat filter
    pub fn announce(&mut self, message: String, now: Instant) -> Option<String> {
        self.commit(message, now)
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_spoken_at {
            Some(at) => now.saturating_duration_since(at) >= self.no_person_cooldown,
            None => true,
        }
    }

    fn commit(&mut self, message: String, now: Instant) -> Option<String> {
        if message == self.last_message {
            return None;
        }
        self.last_message = message.clone();
        self.last_spoken_at = Some(now);
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NO_PERSON_WARNING, REP_COMPLETED_EVENT};

    fn debouncer() -> VoiceDebouncer {
        VoiceDebouncer::new(Duration::from_secs(5))
    }

    fn stage(label: &str) -> AnalysisResult {
        AnalysisResult {
            stage: Some(label.to_string()),
            ..Default::default()
        }
    }

    fn no_person() -> AnalysisResult {
        AnalysisResult {
            warning: Some(NO_PERSON_WARNING.to_string()),
            ..Default::default()
        }
    }

    fn rep_done(reps: u32) -> AnalysisResult {
        AnalysisResult {
            rep_count: Some(reps),
            event: Some(REP_COMPLETED_EVENT.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_repeated_stage_spoken_once() {
        let mut voice = debouncer();
        let now = Instant::now();

        assert_eq!(voice.select(&stage("up"), now).as_deref(), Some("up"));
        for i in 1..20 {
            assert!(voice.select(&stage("up"), now + Duration::from_secs(i)).is_none());
        }
    }

    #[test]
    fn test_never_repeats_message_back_to_back() {
        let mut voice = debouncer();
        let start = Instant::now();
        let results = [stage("up"), stage("down"), stage("up"), no_person(), no_person(), stage("down")];

        let mut spoken = Vec::new();
        for (i, result) in results.iter().enumerate() {
            if let Some(msg) = voice.select(result, start + Duration::from_secs(6 * i as u64)) {
                spoken.push(msg);
            }
        }

        assert!(spoken.windows(2).all(|w| w[0] != w[1]));
        assert_eq!(spoken, ["up", "down", "up", MOVE_INTO_FRAME_PROMPT, "down"]);
    }

    #[test]
    fn test_neutral_stage_is_silent() {
        let mut voice = debouncer();
        assert!(voice.select(&stage(NEUTRAL_STAGE), Instant::now()).is_none());
        assert!(voice.select(&AnalysisResult::default(), Instant::now()).is_none());
    }

    #[test]
    fn test_empty_stage_is_silent_and_keeps_last_stage() {
        let mut voice = debouncer();
        let now = Instant::now();

        assert_eq!(voice.select(&stage("up"), now).as_deref(), Some("up"));
        assert!(voice.select(&stage(""), now).is_none());
        assert_eq!(voice.last_message(), "up");

        // "up" is still the last stage, so it is not announced again
        assert!(voice.select(&stage("up"), now).is_none());
    }

    #[test]
    fn test_no_person_prompt_respects_cooldown() {
        let mut voice = debouncer();
        let start = Instant::now();

        assert_eq!(
            voice.select(&no_person(), start).as_deref(),
            Some(MOVE_INTO_FRAME_PROMPT)
        );

        // Another message resets the repeat filter but the cooldown still counts
        assert_eq!(
            voice.select(&stage("up"), start + Duration::from_secs(1)).as_deref(),
            Some("up")
        );
        assert!(voice.select(&no_person(), start + Duration::from_secs(4)).is_none());
        assert_eq!(
            voice.select(&no_person(), start + Duration::from_secs(6)).as_deref(),
            Some(MOVE_INTO_FRAME_PROMPT)
        );
    }

    #[test]
    fn test_rep_completion_only_for_new_counts() {
        let mut voice = debouncer();
        let now = Instant::now();

        assert_eq!(voice.select(&rep_done(1), now).as_deref(), Some("Rep 1 completed"));
        assert!(voice.select(&rep_done(1), now).is_none());
        assert_eq!(voice.select(&rep_done(2), now).as_deref(), Some("Rep 2 completed"));
    }

    #[test]
    fn test_rep_event_without_count_is_ignored() {
        let mut voice = debouncer();
        let result = AnalysisResult {
            event: Some(REP_COMPLETED_EVENT.to_string()),
            ..Default::default()
        };
        assert!(voice.select(&result, Instant::now()).is_none());
    }

    #[test]
    fn test_stage_change_overrides_earlier_candidates() {
        let mut voice = debouncer();
        let result = AnalysisResult {
            warning: Some(NO_PERSON_WARNING.to_string()),
            rep_count: Some(3),
            event: Some(REP_COMPLETED_EVENT.to_string()),
            stage: Some("down".to_string()),
            ..Default::default()
        };

        assert_eq!(voice.select(&result, Instant::now()).as_deref(), Some("down"));

        // The rep tracker still advanced even though its message lost
        assert!(voice.select(&rep_done(3), Instant::now()).is_none());
    }

    #[test]
    fn test_announce_uses_repeat_filter() {
        let mut voice = debouncer();
        let now = Instant::now();
        assert!(voice.announce("Done".to_string(), now).is_some());
        assert!(voice.announce("Done".to_string(), now).is_none());
        assert_eq!(voice.last_message(), "Done");
    }
}
