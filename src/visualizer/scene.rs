// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 3D skeleton plot rendered to an image canvas.
//!
//! Scene points are projected orthographically from a fixed elevation and
//! azimuth (degrees, same convention as matplotlib's `view_init`) onto a
//! canvas that also shows the fixed axis box. The plot only changes when a
//! detection is supplied; frames without one keep the previous skeleton.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use ab_glyph::{FontArc, PxScale};
use image::RgbImage;
use imageproc::drawing::{
    draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size,
};

use crate::topology::Topology;
use crate::transform::ScenePoint;
use crate::visualizer::color::{self, Color};
use crate::visualizer::overlay::draw_thick_line;

/// Title drawn above the plot.
pub const SCENE_TITLE: &str = "3D Pose Skeleton - Front View";

const X_LABEL: &str = "X (Left/Right)";
const Y_LABEL: &str = "Y (Up/Down)";
const Z_LABEL: &str = "Z (Depth - Towards/Away)";

/// Relative box extents along x, y and z.
const BOX_ASPECT: [f32; 3] = [1.0, 1.0, 0.75];

const POINT_RADIUS: i32 = 3;
const LINE_THICKNESS: u32 = 2;
const LABEL_SCALE: f32 = 16.0;
const TITLE_SCALE: f32 = 22.0;

/// Fixed camera and axis bounds of the 3D plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneView {
    /// Camera elevation above the x-y plane, in degrees.
    pub elevation: f32,
    /// Camera azimuth around the z axis, in degrees.
    pub azimuth: f32,
    /// Horizontal bounds.
    pub x_bounds: (f32, f32),
    /// Vertical bounds.
    pub y_bounds: (f32, f32),
    /// Depth bounds.
    pub z_bounds: (f32, f32),
}

impl Default for SceneView {
    fn default() -> Self {
        Self {
            elevation: 75.0,
            azimuth: -105.0,
            x_bounds: (0.0, 1.0),
            y_bounds: (0.0, 1.0),
            z_bounds: (-0.5, 0.5),
        }
    }
}

impl SceneView {
    /// Set the camera angles.
    #[must_use]
    pub const fn with_angles(mut self, elevation: f32, azimuth: f32) -> Self {
        self.elevation = elevation;
        self.azimuth = azimuth;
        self
    }

    /// Project a scene point to view coordinates `(right, up)` in box units.
    ///
    /// The axis box is centered on the origin with extents [`BOX_ASPECT`].
    #[must_use]
    pub fn project(&self, p: &ScenePoint) -> (f32, f32) {
        let norm = |v: f32, (lo, hi): (f32, f32), aspect: f32| {
            let span = hi - lo;
            if span.abs() < f32::EPSILON {
                0.0
            } else {
                ((v - lo) / span - 0.5) * aspect
            }
        };
        let x = norm(p.x, self.x_bounds, BOX_ASPECT[0]);
        let y = norm(p.y, self.y_bounds, BOX_ASPECT[1]);
        let z = norm(p.z, self.z_bounds, BOX_ASPECT[2]);

        let (se, ce) = self.elevation.to_radians().sin_cos();
        let (sa, ca) = self.azimuth.to_radians().sin_cos();

        // right = (-sin a, cos a, 0), up = (-sin e cos a, -sin e sin a, cos e)
        let right = (-sa).mul_add(x, ca * y);
        let up = (-se * ca).mul_add(x, (-se * sa).mul_add(y, ce * z));
        (right, up)
    }

    /// Eight corners of the axis box in scene coordinates.
    fn corners(&self) -> [ScenePoint; 8] {
        let (x0, x1) = self.x_bounds;
        let (y0, y1) = self.y_bounds;
        let (z0, z1) = self.z_bounds;
        [
            ScenePoint::new(x0, y0, z0),
            ScenePoint::new(x1, y0, z0),
            ScenePoint::new(x1, y1, z0),
            ScenePoint::new(x0, y1, z0),
            ScenePoint::new(x0, y0, z1),
            ScenePoint::new(x1, y0, z1),
            ScenePoint::new(x1, y1, z1),
            ScenePoint::new(x0, y1, z1),
        ]
    }
}

/// Index pairs into [`SceneView::corners`] forming the box edges.
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// The skeleton currently on the plot.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    /// Plotted points.
    pub points: Vec<ScenePoint>,
    /// Plotted segments, as index pairs into `points`.
    pub segments: Vec<(usize, usize)>,
}

/// Renders the 3D plot and keeps the last skeleton on screen.
pub struct SceneRenderer {
    view: SceneView,
    size: (u32, u32),
    font: Option<FontArc>,
    state: Option<SceneState>,
    canvas: RgbImage,
    redraws: usize,
}

impl SceneRenderer {
    /// Create a renderer showing an empty plot.
    #[must_use]
    pub fn new(view: SceneView, size: (u32, u32)) -> Self {
        let mut renderer = Self {
            view,
            size,
            font: None,
            state: None,
            canvas: RgbImage::new(size.0, size.1),
            redraws: 0,
        };
        renderer.render();
        renderer
    }

    /// Use `font` for the title and axis labels.
    #[must_use]
    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self.render();
        self
    }

    /// Replace the plotted skeleton with `points` joined by `topology`.
    ///
    /// Returns `false` without touching the plot when `points` is `None`.
    pub fn redraw(&mut self, points: Option<&[ScenePoint]>, topology: &Topology) -> bool {
        let Some(points) = points else {
            return false;
        };

        let segments = topology
            .segments()
            .iter()
            .copied()
            .filter(|&(a, b)| a < points.len() && b < points.len())
            .collect();
        self.state = Some(SceneState {
            points: points.to_vec(),
            segments,
        });
        self.render();
        self.redraws += 1;
        true
    }

    /// The current plot image.
    #[must_use]
    pub const fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// The skeleton on the plot, if any has been drawn.
    #[must_use]
    pub const fn state(&self) -> Option<&SceneState> {
        self.state.as_ref()
    }

    /// Number of times the plot was cleared and redrawn.
    #[must_use]
    pub const fn redraw_count(&self) -> usize {
        self.redraws
    }

    /// The fixed view.
    #[must_use]
    pub const fn view(&self) -> &SceneView {
        &self.view
    }

    /// Canvas pixel position of a scene point.
    #[must_use]
    pub fn to_canvas(&self, p: &ScenePoint) -> (f32, f32) {
        let (w, h) = (self.size.0 as f32, self.size.1 as f32);
        let scale = 0.55 * w.min(h);
        let (right, up) = self.view.project(p);
        (right.mul_add(scale, w / 2.0), (-up).mul_add(scale, h * 0.52))
    }

    fn render(&mut self) {
        let background = color::SCENE_BACKGROUND.to_rgb();
        let mut canvas = RgbImage::from_pixel(self.size.0, self.size.1, background);

        let corners = self.view.corners().map(|c| self.to_canvas(&c));
        let axes = color::SCENE_AXES.to_rgb();
        for (a, b) in BOX_EDGES {
            draw_line_segment_mut(&mut canvas, corners[a], corners[b], axes);
        }

        if let Some(state) = &self.state {
            let projected: Vec<(f32, f32)> =
                state.points.iter().map(|p| self.to_canvas(p)).collect();
            for &(a, b) in &state.segments {
                draw_thick_line(
                    &mut canvas,
                    projected[a],
                    projected[b],
                    LINE_THICKNESS,
                    Color::BLUE.to_rgb(),
                );
            }
            for &(x, y) in &projected {
                draw_filled_circle_mut(
                    &mut canvas,
                    (x.round() as i32, y.round() as i32),
                    POINT_RADIUS,
                    Color::RED.to_rgb(),
                );
            }
        }

        if let Some(font) = &self.font {
            let label = PxScale::from(LABEL_SCALE);
            let mid = |a: usize, b: usize| {
                let (pa, pb) = (corners[a], corners[b]);
                ((pa.0 + pb.0) / 2.0, (pa.1 + pb.1) / 2.0)
            };
            let labels = [
                (X_LABEL, mid(0, 1)),
                (Y_LABEL, mid(1, 2)),
                (Z_LABEL, mid(0, 4)),
            ];
            for (text, (x, y)) in labels {
                let (tw, _) = text_size(label, font, text);
                let x = (x - tw as f32 / 2.0).max(0.0) as i32;
                draw_text_mut(&mut canvas, axes, x, y as i32 + 6, label, font, text);
            }

            let title = PxScale::from(TITLE_SCALE);
            let (tw, _) = text_size(title, font, SCENE_TITLE);
            let x = (self.size.0.saturating_sub(tw) / 2) as i32;
            draw_text_mut(
                &mut canvas,
                Color::BLACK.to_rgb(),
                x,
                8,
                title,
                font,
                SCENE_TITLE,
            );
        }

        self.canvas = canvas;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::tests::standing_figure;
    use crate::transform::to_scene_space;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_default_view() {
        let view = SceneView::default();
        assert!((view.elevation - 75.0).abs() < EPS);
        assert!((view.azimuth + 105.0).abs() < EPS);
        assert_eq!(view.z_bounds, (-0.5, 0.5));
    }

    #[test]
    fn test_top_down_projection_axes() {
        // Looking straight down the z axis with x to the right.
        let view = SceneView::default().with_angles(90.0, -90.0);
        let (r0, u0) = view.project(&ScenePoint::new(0.5, 0.5, 0.0));
        assert!(r0.abs() < EPS && u0.abs() < EPS);

        let (r, u) = view.project(&ScenePoint::new(1.0, 0.5, 0.0));
        assert!((r - 0.5).abs() < EPS && u.abs() < EPS);

        let (r, u) = view.project(&ScenePoint::new(0.5, 1.0, 0.0));
        assert!(r.abs() < EPS && (u - 0.5).abs() < EPS);

        // Depth does not move the point when viewed along it.
        let (r, u) = view.project(&ScenePoint::new(0.5, 0.5, 0.5));
        assert!(r.abs() < EPS && u.abs() < EPS);
    }

    #[test]
    fn test_box_fits_canvas() {
        let renderer = SceneRenderer::new(SceneView::default(), (1000, 800));
        for corner in renderer.view().corners() {
            let (x, y) = renderer.to_canvas(&corner);
            assert!((0.0..1000.0).contains(&x), "x {x}");
            assert!((0.0..800.0).contains(&y), "y {y}");
        }
    }

    #[test]
    fn test_redraw_replaces_state() {
        let mut renderer = SceneRenderer::new(SceneView::default(), (200, 160));
        assert!(renderer.state().is_none());
        let empty = renderer.canvas().clone();

        let points = to_scene_space(&standing_figure());
        assert!(renderer.redraw(Some(&points), &Topology::body()));
        assert_eq!(renderer.redraw_count(), 1);

        let state = renderer.state().unwrap();
        assert_eq!(state.points, points);
        assert_eq!(state.segments.len(), Topology::body().len());
        assert_ne!(renderer.canvas().as_raw(), empty.as_raw());
    }

    #[test]
    fn test_missing_detection_keeps_previous_skeleton() {
        let mut renderer = SceneRenderer::new(SceneView::default(), (200, 160));
        let points = to_scene_space(&standing_figure());
        renderer.redraw(Some(&points), &Topology::body());
        let canvas = renderer.canvas().clone();
        let state = renderer.state().cloned();

        assert!(!renderer.redraw(None, &Topology::body()));
        assert_eq!(renderer.redraw_count(), 1);
        assert_eq!(renderer.state().cloned(), state);
        assert_eq!(renderer.canvas().as_raw(), canvas.as_raw());
    }
}
