// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose estimation.
//!
//! A [`PoseEstimator`] turns one RGB image into at most one [`LandmarkSet`].
//! Estimators in continuous tracking mode keep state between calls, so a single
//! instance must see the frames of one stream in order, from one caller.

mod blazepose;

pub use blazepose::{BlazePoseEstimator, SegmentationMask};

use image::RgbImage;

use crate::config::EstimatorConfig;
use crate::error::Result;
use crate::landmarks::LandmarkSet;

/// Detects the landmarks of a single body.
pub trait PoseEstimator {
    /// Detect a body in `image`.
    ///
    /// Returns `Ok(None)` when no body is found.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PoseError::Released`] after [`release`](Self::release),
    /// or an inference error if the model fails.
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>>;

    /// Free model resources. Calling it again has no effect.
    fn release(&mut self);

    /// Whether [`release`](Self::release) has been called.
    fn is_released(&self) -> bool;

    /// Segmentation of the body found by the last [`detect`](Self::detect),
    /// for estimators that produce one.
    fn segmentation_mask(&self) -> Option<&SegmentationMask> {
        None
    }
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        (**self).detect(image)
    }

    fn release(&mut self) {
        (**self).release();
    }

    fn is_released(&self) -> bool {
        (**self).is_released()
    }

    fn segmentation_mask(&self) -> Option<&SegmentationMask> {
        (**self).segmentation_mask()
    }
}

/// Load the estimator described by `config`.
///
/// # Errors
///
/// Returns [`crate::PoseError::ModelLoadError`] if the model cannot be loaded.
pub fn open_estimator(config: &EstimatorConfig) -> Result<Box<dyn PoseEstimator>> {
    Ok(Box::new(BlazePoseEstimator::load(config.clone())?))
}
