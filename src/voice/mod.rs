//! Spoken coaching cues
//!
//! A [`Speaker`] voices text fire-and-forget; the [`VoiceDebouncer`] decides
//! what is worth saying.

pub mod debounce;

use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::broadcast;

use crate::config::VoiceConfig;

pub use debounce::{VoiceDebouncer, MOVE_INTO_FRAME_PROMPT};

/// Text-to-speech capability. Implementations must not block and the caller
/// never learns whether playback finished.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
}

/// Runs a local TTS program (e.g. `espeak`) with the text as its last argument
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, dropping spoken cue: {}", text);
            return;
        };

        let _guard = handle.enter();
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap in the background so finished players don't linger as zombies
                handle.spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => {
                tracing::warn!("Failed to launch TTS program '{}': {}", self.program, e);
            }
        }
    }
}

/// Publishes text to subscribers (the SSE stream) so a browser can voice it
#[derive(Debug, Clone)]
pub struct BroadcastSpeaker {
    tx: broadcast::Sender<String>,
}

impl BroadcastSpeaker {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Speaker for BroadcastSpeaker {
    fn speak(&self, text: &str) {
        // No subscribers is fine
        let _ = self.tx.send(text.to_string());
    }
}

/// Forwards every utterance to each inner speaker
#[derive(Clone, Default)]
pub struct FanoutSpeaker {
    speakers: Vec<Arc<dyn Speaker>>,
}

impl FanoutSpeaker {
    pub fn new(speakers: Vec<Arc<dyn Speaker>>) -> Self {
        Self { speakers }
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

impl Speaker for FanoutSpeaker {
    fn speak(&self, text: &str) {
        for speaker in &self.speakers {
            speaker.speak(text);
        }
    }
}

/// Build the speaker described by the voice config.
///
/// Disabled voice yields an empty fanout; the debouncer still runs.
pub fn build_speaker(config: &VoiceConfig, speech_tx: broadcast::Sender<String>) -> Arc<dyn Speaker> {
    if !config.enabled {
        tracing::info!("Voice cues disabled");
        return Arc::new(FanoutSpeaker::default());
    }

    let mut speakers: Vec<Arc<dyn Speaker>> = vec![Arc::new(BroadcastSpeaker::new(speech_tx))];

    if let Some(ref program) = config.command {
        if !program.trim().is_empty() {
            tracing::info!("Voice cues via local TTS: {}", program);
            speakers.push(Arc::new(CommandSpeaker::new(program, &config.args)));
        }
    }

    Arc::new(FanoutSpeaker::new(speakers))
}
