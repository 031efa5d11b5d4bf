// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for the pose model.
//!
//! The landmark model looks at a square region of interest (ROI) of the frame.
//! This module crops and resamples that region into a normalized input tensor,
//! and maps model-space coordinates back to the frame.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

use image::RgbImage;
use ndarray::Array4;

/// Value of pixels sampled outside the frame (black, as the model was trained with).
pub const PAD_VALUE: f32 = 0.0;

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Scale applied to the alignment-point radius when deriving a tracking ROI.
pub const ROI_SCALE: f32 = 1.25;

/// Memory layout of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// Batch, channels, height, width.
    Nchw,
    /// Batch, height, width, channels.
    Nhwc,
}

/// A square region of the frame, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Center column.
    pub center_x: f32,
    /// Center row.
    pub center_y: f32,
    /// Side length.
    pub size: f32,
}

impl Roi {
    /// The square covering the whole frame, centered on it.
    #[must_use]
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            center_x: width as f32 / 2.0,
            center_y: height as f32 / 2.0,
            size: width.max(height) as f32,
        }
    }

    /// ROI centered on `center`, sized from the distance to `scale_point`.
    ///
    /// Both points are in frame pixels. Returns `None` for a degenerate radius.
    #[must_use]
    pub fn from_alignment(center: (f32, f32), scale_point: (f32, f32)) -> Option<Self> {
        let radius = (scale_point.0 - center.0).hypot(scale_point.1 - center.1);
        if !radius.is_finite() || radius < 1.0 {
            return None;
        }
        Some(Self {
            center_x: center.0,
            center_y: center.1,
            size: 2.0 * radius * ROI_SCALE,
        })
    }

    /// Left edge in frame pixels.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.center_x - self.size / 2.0
    }

    /// Top edge in frame pixels.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.center_y - self.size / 2.0
    }

    /// Map a model-space point (`0..input_size`) to frame pixels.
    #[must_use]
    pub fn to_frame(&self, x: f32, y: f32, input_size: usize) -> (f32, f32) {
        let scale = self.size / input_size as f32;
        (self.left() + x * scale, self.top() + y * scale)
    }
}

/// Crop `roi` out of `image`, resample it bilinearly to `input_size` squared,
/// and normalize to `[0, 1]`.
#[must_use]
pub fn crop_to_tensor(
    image: &RgbImage,
    roi: &Roi,
    input_size: usize,
    layout: TensorLayout,
) -> Array4<f32> {
    let mut tensor = match layout {
        TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, input_size, input_size)),
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, input_size, input_size, 3)),
    };

    let scale = roi.size / input_size as f32;
    let (left, top) = (roi.left(), roi.top());

    for oy in 0..input_size {
        let sy = (oy as f32 + 0.5).mul_add(scale, top) - 0.5;
        for ox in 0..input_size {
            let sx = (ox as f32 + 0.5).mul_add(scale, left) - 0.5;
            let rgb = sample_bilinear(image, sx, sy);
            for (c, value) in rgb.into_iter().enumerate() {
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, oy, ox]] = value,
                    TensorLayout::Nhwc => tensor[[0, oy, ox, c]] = value,
                }
            }
        }
    }

    tensor
}

/// Sample a normalized RGB value at a fractional position, padding outside the frame.
fn sample_bilinear(image: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let x0 = x.floor();
    let y0 = y.floor();
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let texel = |px: i64, py: i64| -> [f32; 3] {
        if px < 0 || py < 0 || px >= w || py >= h {
            return [PAD_VALUE; 3];
        }
        let p = image.get_pixel(px as u32, py as u32);
        [
            f32::from(p[0]) * INV_255,
            f32::from(p[1]) * INV_255,
            f32::from(p[2]) * INV_255,
        ]
    };

    let (a, b, c, d) = (
        texel(x0, y0),
        texel(x0 + 1, y0),
        texel(x0, y0 + 1),
        texel(x0 + 1, y0 + 1),
    );

    let mut out = [0.0; 3];
    for i in 0..3 {
        let top = (b[i] - a[i]).mul_add(fx, a[i]);
        let bottom = (d[i] - c[i]).mul_add(fx, c[i]);
        out[i] = (bottom - top).mul_add(fy, top);
    }
    out
}

/// Logistic sigmoid.
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_frame_roi() {
        let roi = Roi::full_frame(640, 480);
        assert!((roi.center_x - 320.0).abs() < f32::EPSILON);
        assert!((roi.center_y - 240.0).abs() < f32::EPSILON);
        assert!((roi.size - 640.0).abs() < f32::EPSILON);
        assert!((roi.top() + 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_alignment_roi() {
        let roi = Roi::from_alignment((100.0, 200.0), (100.0, 160.0)).unwrap();
        assert!((roi.size - 100.0).abs() < 1e-4);
        assert!(Roi::from_alignment((10.0, 10.0), (10.0, 10.0)).is_none());
    }

    #[test]
    fn test_roi_maps_model_space_back_to_frame() {
        let roi = Roi::full_frame(640, 480);
        let (x, y) = roi.to_frame(128.0, 128.0, 256);
        assert!((x - 320.0).abs() < 1e-4);
        assert!((y - 240.0).abs() < 1e-4);

        let (x, y) = roi.to_frame(0.0, 0.0, 256);
        assert!(x.abs() < 1e-4);
        assert!((y + 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_crop_layout_and_padding() {
        let image = RgbImage::from_pixel(64, 32, image::Rgb([255, 0, 51]));
        let roi = Roi::full_frame(64, 32);

        let nchw = crop_to_tensor(&image, &roi, 16, TensorLayout::Nchw);
        assert_eq!(nchw.shape(), &[1, 3, 16, 16]);
        // Center row is inside the frame.
        assert!((nchw[[0, 0, 8, 8]] - 1.0).abs() < 1e-5);
        assert!((nchw[[0, 2, 8, 8]] - 0.2).abs() < 1e-5);
        // Top row falls in the padded band above the frame.
        assert!(nchw[[0, 0, 0, 8]].abs() < 1e-5);

        let nhwc = crop_to_tensor(&image, &roi, 16, TensorLayout::Nhwc);
        assert_eq!(nhwc.shape(), &[1, 16, 16, 3]);
        assert!((nhwc[[0, 8, 8, 0]] - nchw[[0, 0, 8, 8]]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < f32::EPSILON);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
