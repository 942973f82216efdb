//! Frame capture module
//!
//! Video sources and the sampler that turns a live frame into a compact
//! analysis payload.

pub mod sampler;

use image::DynamicImage;
use std::sync::RwLock;

pub use sampler::{EncodedFrame, FrameSampler};

/// Provides the current video frame, or nothing if the feed is not ready
pub trait VideoSource: Send + Sync {
    fn current_frame(&self) -> Option<DynamicImage>;
}

/// Holds the most recent frame pushed by a client (e.g. a browser posting
/// camera snapshots).
#[derive(Debug, Default)]
pub struct SharedFrameSource {
    frame: RwLock<Option<DynamicImage>>,
}

impl SharedFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame
    pub fn push(&self, frame: DynamicImage) {
        let mut current = self.frame.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(frame);
    }

    /// Forget the current frame, e.g. when the client disconnects
    pub fn clear(&self) {
        let mut current = self.frame.write().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }
}

impl VideoSource for SharedFrameSource {
    fn current_frame(&self) -> Option<DynamicImage> {
        self.frame.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
