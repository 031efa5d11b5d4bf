// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Coordinate conversions from the estimator's normalized space.
//!
//! Both conversions are pure functions of a [`LandmarkSet`]; they can be computed
//! from the same set in the same frame without interfering with each other.

use crate::landmarks::LandmarkSet;

/// A landmark projected onto a frame's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    /// Column in pixels.
    pub x: i32,
    /// Row in pixels.
    pub y: i32,
    /// Visibility carried over from the landmark.
    pub visibility: f32,
}

/// A landmark in the 3D scene: `y` up, `z` toward the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenePoint {
    /// Left/right.
    pub x: f32,
    /// Up/down.
    pub y: f32,
    /// Depth, positive toward the viewer.
    pub z: f32,
}

impl ScenePoint {
    /// Create a new scene point.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Scale normalized landmarks to the pixel grid of a `width` x `height` frame.
///
/// Coordinates are rounded to the nearest pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn to_pixel_space(landmarks: &LandmarkSet, width: u32, height: u32) -> Vec<PixelPoint> {
    let (w, h) = (width as f32, height as f32);
    landmarks
        .iter()
        .map(|lm| PixelPoint {
            x: (lm.x * w).round() as i32,
            y: (lm.y * h).round() as i32,
            visibility: lm.visibility,
        })
        .collect()
}

/// Map normalized landmarks into scene space.
///
/// The vertical axis is flipped so that up in the scene is up in the image, and
/// depth is negated so that positive `z` points toward the viewer.
#[must_use]
pub fn to_scene_space(landmarks: &LandmarkSet) -> Vec<ScenePoint> {
    landmarks
        .iter()
        .map(|lm| ScenePoint::new(lm.x, 1.0 - lm.y, -lm.z))
        .collect()
}
