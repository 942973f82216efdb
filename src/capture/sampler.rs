//! Frame downsizing and JPEG re-encoding

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use super::VideoSource;
use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// A frame ready to submit to the analysis service
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Base64 JPEG at the configured resolution
    pub payload: String,
    /// Dimensions of the original video frame, used to size the overlay
    pub source_width: u32,
    pub source_height: u32,
}

/// Resizes frames to a fixed resolution and re-encodes them at reduced quality
#[derive(Debug, Clone)]
pub struct FrameSampler {
    width: u32,
    height: u32,
    quality: u8,
}

impl FrameSampler {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            quality: config.jpeg_quality.clamp(1, 100),
        }
    }

    /// Capture and encode the current frame.
    ///
    /// Returns `Ok(None)` when the source has no frame yet.
    pub fn sample(&self, source: &dyn VideoSource) -> Result<Option<EncodedFrame>, CaptureError> {
        match source.current_frame() {
            Some(frame) => self.encode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Encode one frame
    pub fn encode(&self, frame: &DynamicImage) -> Result<EncodedFrame, CaptureError> {
        let resized = frame
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&resized)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        Ok(EncodedFrame {
            payload: STANDARD.encode(&jpeg),
            source_width: frame.width(),
            source_height: frame.height(),
        })
    }
}
