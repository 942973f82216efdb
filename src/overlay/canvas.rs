//! Raster overlay surface backed by an RGBA image

use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::io::Cursor;

use super::Surface;
use crate::config::OverlayConfig;
use crate::error::WebError;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const POINT_COLOR: Rgba<u8> = Rgba([255, 64, 64, 255]);
const LINE_COLOR: Rgba<u8> = Rgba([0, 255, 128, 255]);

/// Transparent RGBA layer meant to sit on top of the video preview
#[derive(Debug, Clone)]
pub struct OverlayCanvas {
    image: RgbaImage,
    line_thickness: i32,
}

impl OverlayCanvas {
    pub fn new(width: u32, height: u32, config: &OverlayConfig) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
            line_thickness: config.line_thickness.max(1),
        }
    }

    /// Match the canvas to the video frame size; contents are dropped on change
    pub fn fit_to(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::from_pixel(width, height, TRANSPARENT);
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Encode the current layer as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, WebError> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| WebError::Overlay(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

impl Surface for OverlayCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: i32) {
        let center = (center.0.round() as i32, center.1.round() as i32);
        draw_filled_circle_mut(&mut self.image, center, radius, POINT_COLOR);
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32)) {
        // Thicken by stacking offset single-pixel segments on both axes
        let half = self.line_thickness / 2;
        for offset in -half..=half {
            let d = offset as f32;
            draw_line_segment_mut(&mut self.image, (from.0 + d, from.1), (to.0 + d, to.1), LINE_COLOR);
            draw_line_segment_mut(&mut self.image, (from.0, from.1 + d), (to.0, to.1 + d), LINE_COLOR);
        }
    }
}
