// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Body landmark types.
//!
//! A [`LandmarkSet`] always holds exactly [`NUM_LANDMARKS`] points, and index `i`
//! always refers to the same anatomical joint (see [`BodyLandmark`]).

use crate::error::{PoseError, Result};

/// Number of landmarks produced by the pose model.
pub const NUM_LANDMARKS: usize = 33;

/// One tracked anatomical point in the estimator's normalized output space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Horizontal position relative to image width, nominally in `[0, 1]`.
    pub x: f32,
    /// Vertical position relative to image height, nominally in `[0, 1]`.
    pub y: f32,
    /// Relative depth, centered near zero. Smaller is closer to the camera.
    pub z: f32,
    /// Likelihood that the landmark is visible in the frame, in `[0, 1]`.
    pub visibility: f32,
}

impl Landmark {
    /// Create a fully visible landmark.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
        }
    }

    /// Set the visibility score.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = visibility;
        self
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// The landmarks of one detected body.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Landmark; NUM_LANDMARKS],
}

impl LandmarkSet {
    /// Create a landmark set from a fixed-size array.
    #[must_use]
    pub const fn new(points: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Create a landmark set from a slice.
    ///
    /// # Errors
    ///
    /// Returns an error unless the slice holds exactly [`NUM_LANDMARKS`] points.
    pub fn from_slice(points: &[Landmark]) -> Result<Self> {
        let points: [Landmark; NUM_LANDMARKS] = points.try_into().map_err(|_| {
            PoseError::InferenceError(format!(
                "Expected {NUM_LANDMARKS} landmarks, got {}",
                points.len()
            ))
        })?;
        Ok(Self { points })
    }

    /// All landmarks in index order.
    #[must_use]
    pub const fn points(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.points
    }

    /// Landmark for a named joint.
    #[must_use]
    pub const fn get(&self, joint: BodyLandmark) -> &Landmark {
        &self.points[joint as usize]
    }

    /// Iterate over the landmarks in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
        self.points.iter()
    }

    /// Number of landmarks (always [`NUM_LANDMARKS`]).
    #[must_use]
    pub const fn len(&self) -> usize {
        NUM_LANDMARKS
    }

    /// Always `false`; a set is never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl<'a> IntoIterator for &'a LandmarkSet {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Which side of the body a landmark belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySide {
    /// The subject's left.
    Left,
    /// The subject's right.
    Right,
    /// On the body's midline (the nose).
    Center,
}

/// Landmark indices of the 33-point body model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    /// Body side of the landmark at `index`.
    ///
    /// The face indices 1-3 are left and 4-6 right; from 7 on, odd is left.
    #[must_use]
    pub const fn side_of(index: usize) -> BodySide {
        match index {
            0 => BodySide::Center,
            1..=3 => BodySide::Left,
            4..=6 => BodySide::Right,
            i if i % 2 == 1 => BodySide::Left,
            _ => BodySide::Right,
        }
    }

    /// Body side of this landmark.
    #[must_use]
    pub const fn side(self) -> BodySide {
        Self::side_of(self as usize)
    }
}
