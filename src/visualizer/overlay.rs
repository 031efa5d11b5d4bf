// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 2D skeleton overlay drawn onto source frames.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::time::Instant;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{GrayImage, RgbImage};
use image::imageops::{self, FilterType};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};

use crate::landmarks::{BodyLandmark, BodySide};
use crate::topology::Topology;
use crate::transform::PixelPoint;
use crate::visualizer::color::{self, Color};

/// Baseline origin of the FPS readout on the display frame.
pub const FPS_ORIGIN: (i32, i32) = (10, 30);

/// Height of the FPS readout in pixels.
const FPS_SCALE: f32 = 30.0;

/// Mask values at or above this count as body.
const MASK_THRESHOLD: u8 = 128;

/// Opacity of the segmentation tint.
const MASK_ALPHA: f32 = 0.4;

/// How landmark markers are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkPalette {
    /// Color by body side.
    BySide {
        /// Subject's left.
        left: Color,
        /// Subject's right.
        right: Color,
        /// Midline.
        center: Color,
    },
    /// One color for every landmark.
    Uniform(Color),
}

impl LandmarkPalette {
    /// Color of the landmark at `index`.
    #[must_use]
    pub const fn color_of(&self, index: usize) -> Color {
        match *self {
            Self::Uniform(c) => c,
            Self::BySide {
                left,
                right,
                center,
            } => match BodyLandmark::side_of(index) {
                BodySide::Left => left,
                BodySide::Right => right,
                BodySide::Center => center,
            },
        }
    }
}

/// Marker and bone appearance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Landmark marker radius in pixels. Zero disables markers.
    pub landmark_radius: i32,
    /// Bone line thickness in pixels.
    pub connection_thickness: u32,
    /// Bone color.
    pub connection_color: Color,
    /// Marker colors.
    pub palette: LandmarkPalette,
    /// Landmarks less visible than this are skipped, with their bones.
    pub min_visibility: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            landmark_radius: 2,
            connection_thickness: 2,
            connection_color: color::BONE,
            palette: LandmarkPalette::BySide {
                left: color::LEFT_LANDMARK,
                right: color::RIGHT_LANDMARK,
                center: color::CENTER_LANDMARK,
            },
            min_visibility: 0.5,
        }
    }
}

impl OverlayStyle {
    /// Green dots and red bones, used for annotated still images.
    #[must_use]
    pub fn still_image() -> Self {
        Self {
            landmark_radius: 3,
            connection_thickness: 2,
            connection_color: Color::RED,
            palette: LandmarkPalette::Uniform(Color::GREEN),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_radius(mut self, radius: i32) -> Self {
        self.landmark_radius = radius;
        self
    }

    #[must_use]
    pub const fn with_thickness(mut self, thickness: u32) -> Self {
        self.connection_thickness = thickness;
        self
    }

    #[must_use]
    pub const fn with_min_visibility(mut self, min_visibility: f32) -> Self {
        self.min_visibility = min_visibility;
        self
    }
}

/// Draws a skeleton over a frame in pixel space.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    /// Create a renderer with the given style.
    #[must_use]
    pub const fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// The drawing style in use.
    #[must_use]
    pub const fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Draw `topology` over `frame` using `points`.
    ///
    /// Leaves `frame` untouched and returns `false` when `points` is `None`.
    pub fn draw(
        &self,
        frame: &mut RgbImage,
        points: Option<&[PixelPoint]>,
        topology: &Topology,
    ) -> bool {
        let Some(points) = points else {
            return false;
        };

        let visible = |i: usize| {
            points
                .get(i)
                .is_some_and(|p| p.visibility >= self.style.min_visibility)
        };

        let bone = self.style.connection_color.to_rgb();
        for &(a, b) in topology.segments() {
            if visible(a) && visible(b) {
                let (pa, pb) = (points[a], points[b]);
                draw_thick_line(
                    frame,
                    (pa.x as f32, pa.y as f32),
                    (pb.x as f32, pb.y as f32),
                    self.style.connection_thickness,
                    bone,
                );
            }
        }

        if self.style.landmark_radius > 0 {
            for (i, p) in points.iter().enumerate() {
                if visible(i) {
                    let c = self.style.palette.color_of(i).to_rgb();
                    draw_filled_circle_mut(frame, (p.x, p.y), self.style.landmark_radius, c);
                }
            }
        }

        true
    }

    /// Tint the pixels of `frame` that `mask` marks as body.
    ///
    /// The mask must already be in frame space. Returns `false` and leaves
    /// `frame` untouched when the sizes differ or nothing is marked.
    pub fn draw_mask(&self, frame: &mut RgbImage, mask: &GrayImage) -> bool {
        if frame.dimensions() != mask.dimensions() {
            return false;
        }

        let tint = color::SEGMENTATION.to_rgb();
        let mut tinted = false;
        for (pixel, m) in frame.pixels_mut().zip(mask.pixels()) {
            if m[0] < MASK_THRESHOLD {
                continue;
            }
            for (c, t) in pixel.0.iter_mut().zip(tint.0) {
                *c = (f32::from(*c) * (1.0 - MASK_ALPHA) + f32::from(t) * MASK_ALPHA).round() as u8;
            }
            tinted = true;
        }
        tinted
    }
}

/// Draw a line of the given thickness as parallel one-pixel segments.
pub(crate) fn draw_thick_line(
    frame: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: image::Rgb<u8>,
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let len = dx.hypot(dy);
    if thickness <= 1 || len < f32::EPSILON {
        draw_line_segment_mut(frame, start, end, color);
        return;
    }

    let (nx, ny) = (-dy / len, dx / len);
    let half = (thickness as f32 - 1.0) / 2.0;
    for k in 0..thickness {
        let off = k as f32 - half;
        draw_line_segment_mut(
            frame,
            (off.mul_add(nx, start.0), off.mul_add(ny, start.1)),
            (off.mul_add(nx, end.0), off.mul_add(ny, end.1)),
            color,
        );
    }
}

/// Resize a frame to the display resolution with bilinear filtering.
#[must_use]
pub fn resize_for_display(frame: &RgbImage, size: (u32, u32)) -> RgbImage {
    if frame.dimensions() == size {
        return frame.clone();
    }
    imageops::resize(frame, size.0, size.1, FilterType::Triangle)
}

/// Instantaneous frame rate between rendered frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FpsMeter {
    last: Option<Instant>,
}

impl FpsMeter {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Start measuring from `now`.
    pub const fn start(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Record a rendered frame at `now`.
    ///
    /// Returns `1 / elapsed` since the previous tick, or `None` on the first
    /// tick or when no time has passed.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let prev = self.last.replace(now)?;
        let elapsed = now.saturating_duration_since(prev).as_secs_f64();
        (elapsed > 0.0).then(|| 1.0 / elapsed)
    }
}

/// Text of the FPS readout, truncated to an integer.
#[must_use]
pub fn fps_label(fps: f64) -> String {
    format!("FPS: {}", fps.max(0.0) as u64)
}

/// Draw the FPS readout in green with its baseline at [`FPS_ORIGIN`].
pub fn draw_fps(frame: &mut RgbImage, fps: f64, font: &FontArc) {
    let scale = PxScale::from(FPS_SCALE);
    let ascent = font.as_scaled(scale).ascent().round() as i32;
    let (x, y) = (FPS_ORIGIN.0, (FPS_ORIGIN.1 - ascent).max(0));
    draw_text_mut(
        frame,
        Color::GREEN.to_rgb(),
        x,
        y,
        scale,
        font,
        &fps_label(fps),
    );
}
