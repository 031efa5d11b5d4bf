// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::Rgb;

use crate::landmarks::BodySide;

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Self = Self(255, 0, 0);
    /// Green color.
    pub const GREEN: Self = Self(0, 255, 0);
    /// Blue color.
    pub const BLUE: Self = Self(0, 0, 255);
    /// White color.
    pub const WHITE: Self = Self(255, 255, 255);
    /// Black color.
    pub const BLACK: Self = Self(0, 0, 0);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Convert to an `image` pixel.
    #[must_use]
    pub const fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.0, self.1, self.2])
    }

    /// Pack as `0x00RRGGBB`, the layout `minifb` expects.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }
}

impl From<Color> for Rgb<u8> {
    fn from(c: Color) -> Self {
        c.to_rgb()
    }
}

/// Landmarks on the subject's left side.
pub const LEFT_LANDMARK: Color = Color(255, 138, 0);
/// Landmarks on the subject's right side.
pub const RIGHT_LANDMARK: Color = Color(0, 217, 231);
/// Nose.
pub const CENTER_LANDMARK: Color = Color::WHITE;
/// Bones in the default overlay style.
pub const BONE: Color = Color(224, 224, 224);

/// 3D scene background.
pub const SCENE_BACKGROUND: Color = Color::WHITE;
/// 3D scene bounding box and axis labels.
pub const SCENE_AXES: Color = Color(96, 96, 96);

/// Tint of the segmented body region on the overlay.
pub const SEGMENTATION: Color = Color(0, 120, 255);

/// Default color of a landmark on the given body side.
#[must_use]
pub const fn side_color(side: BodySide) -> Color {
    match side {
        BodySide::Left => LEFT_LANDMARK,
        BodySide::Right => RIGHT_LANDMARK,
        BodySide::Center => CENTER_LANDMARK,
    }
}
