//! Skeleton overlay
//!
//! Draws landmark markers and a fixed set of upper-body connections onto a
//! horizontally mirrored surface so it lines up with a mirrored video preview.

pub mod canvas;

use crate::analysis::Landmark;

pub use canvas::OverlayCanvas;

/// Landmark index pairs joined by a segment: shoulders, arms, torso sides, hips
pub const CONNECTIONS: [(usize, usize); 8] = [
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    (11, 23),
    (12, 24),
    (23, 24),
];

/// How far outside [0, 1] a coordinate may fall and still be drawn
const MAX_OVERSHOOT: f32 = 1.0;

/// What the overlay should do after a tick
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    Draw(Vec<Option<Landmark>>),
    Clear,
}

/// A 2D pixel drawing target
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn clear(&mut self);
    fn fill_circle(&mut self, center: (f32, f32), radius: i32);
    fn line(&mut self, from: (f32, f32), to: (f32, f32));
}

/// Stateless landmark renderer
#[derive(Debug, Clone, Copy)]
pub struct OverlayRenderer {
    point_radius: i32,
}

impl OverlayRenderer {
    pub fn new(point_radius: i32) -> Self {
        Self { point_radius }
    }

    /// Apply a tick's overlay command to the surface
    pub fn apply<S: Surface>(&self, surface: &mut S, command: &OverlayCommand) {
        match command {
            OverlayCommand::Draw(landmarks) => self.render(surface, landmarks),
            OverlayCommand::Clear => surface.clear(),
        }
    }

    /// Clear the surface, then draw every present landmark and each
    /// connection whose endpoints are both present.
    ///
    /// Non-finite coordinates and points far off the canvas count as absent,
    /// so a garbage value cannot turn into an arbitrarily long line walk.
    pub fn render<S: Surface>(&self, surface: &mut S, landmarks: &[Option<Landmark>]) {
        surface.clear();

        let width = surface.width() as f32;
        let height = surface.height() as f32;
        let to_pixel = |lm: &Landmark| ((1.0 - lm.x) * width, lm.y * height);
        let point = |index: usize| landmarks.get(index).copied().flatten().filter(drawable);

        for lm in landmarks.iter().flatten().filter(|lm| drawable(lm)) {
            surface.fill_circle(to_pixel(lm), self.point_radius);
        }

        for &(a, b) in CONNECTIONS.iter() {
            let start = point(a);
            let end = point(b);
            if let (Some(start), Some(end)) = (start, end) {
                surface.line(to_pixel(&start), to_pixel(&end));
            }
        }
    }
}

fn drawable(lm: &Landmark) -> bool {
    let range = -MAX_OVERSHOOT..=1.0 + MAX_OVERSHOOT;
    range.contains(&lm.x) && range.contains(&lm.y)
}
