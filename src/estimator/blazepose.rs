// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! BlazePose landmark model on ONNX Runtime.
//!
//! The model takes a 256x256 RGB crop of the body and returns 39 landmarks of
//! 5 values each (x, y, z in crop pixels, then visibility and presence logits),
//! a pose presence score, and optionally a segmentation map. Landmarks 33 and
//! 34 are alignment points (hip center and a point on the body's bounding
//! circle) used to place the next frame's crop when tracking.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::Path;
use std::time::Instant;

use image::{GrayImage, Luma, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};

#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

use crate::config::{EstimatorConfig, PresenceOutput, TrackingMode};
use crate::error::{PoseError, Result};
use crate::estimator::PoseEstimator;
use crate::landmarks::{Landmark, LandmarkSet, NUM_LANDMARKS};
use crate::preprocessing::{Roi, TensorLayout, crop_to_tensor, sigmoid};
use crate::verbose;

/// Default model input resolution.
const DEFAULT_INPUT_SIZE: usize = 256;

/// Landmarks in the raw output, including the alignment points.
const RAW_LANDMARKS: usize = 39;

/// Values per raw landmark.
const LANDMARK_STRIDE: usize = 5;

/// Index of the alignment center (hip midpoint).
const ALIGN_CENTER: usize = 33;

/// Index of the alignment scale point.
const ALIGN_SCALE: usize = 34;

/// Outputs of one model run, identified by their element counts.
#[derive(Debug, Default)]
struct ModelOutput {
    landmarks: Option<Vec<f32>>,
    presence: Option<f32>,
    segmentation: Option<Vec<f32>>,
}

impl ModelOutput {
    /// Sort a named output into the right slot. Unrecognized outputs are ignored.
    fn absorb(&mut self, data: &[f32], input_size: usize) {
        match data.len() {
            n if n == RAW_LANDMARKS * LANDMARK_STRIDE => self.landmarks = Some(data.to_vec()),
            1 => self.presence = Some(data[0]),
            n if n == input_size * input_size => self.segmentation = Some(data.to_vec()),
            _ => {}
        }
    }

    /// Pose presence as a probability.
    fn presence_score(&self, scale: PresenceOutput) -> f32 {
        match (self.presence, scale) {
            (Some(p), PresenceOutput::Probability) => p,
            (Some(p), PresenceOutput::Logit) => sigmoid(p),
            (None, _) => 0.0,
        }
    }
}

/// Segmentation of the last detection, in crop space.
#[derive(Debug, Clone)]
pub struct SegmentationMask {
    /// Mask pixels, one per model input pixel.
    pub mask: GrayImage,
    /// Crop the mask was computed on.
    pub roi: Roi,
}

impl SegmentationMask {
    /// Resample the mask onto a `width` x `height` frame.
    ///
    /// Pixels outside the crop are zero.
    #[must_use]
    pub fn to_frame(&self, width: u32, height: u32) -> GrayImage {
        let size = self.mask.width() as f32;
        let scale = size / self.roi.size;
        let (left, top) = (self.roi.left(), self.roi.top());
        GrayImage::from_fn(width, height, |x, y| {
            let mx = ((x as f32 + 0.5) - left) * scale;
            let my = ((y as f32 + 0.5) - top) * scale;
            if mx < 0.0 || my < 0.0 || mx >= size || my >= size {
                Luma([0])
            } else {
                *self.mask.get_pixel(mx as u32, my as u32)
            }
        })
    }
}

/// BlazePose landmark estimator.
pub struct BlazePoseEstimator {
    session: Option<Session>,
    config: EstimatorConfig,
    input_name: String,
    output_names: Vec<String>,
    input_size: usize,
    layout: TensorLayout,
    previous_roi: Option<Roi>,
    mask: Option<SegmentationMask>,
    warmed_up: bool,
}

impl BlazePoseEstimator {
    /// Load the model selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for invalid thresholds and
    /// [`PoseError::ModelLoadError`] if the model file is missing or invalid.
    pub fn load(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        let path = config.model_path();
        if !path.exists() {
            return Err(PoseError::ModelLoadError(format!(
                "Model file not found: {} (fidelity {})",
                path.display(),
                config.fidelity
            )));
        }

        let session = build_session(&path, config.num_threads)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| PoseError::ModelLoadError("Model has no inputs".to_string()))?;
        let input_name = input.name.clone();
        let (layout, input_size) = match &input.input_type {
            ValueType::Tensor { shape, .. } => input_geometry(shape),
            _ => (TensorLayout::Nhwc, DEFAULT_INPUT_SIZE),
        };
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

        verbose!(
            "Loaded {} ({layout:?}, {input_size}x{input_size})",
            path.display()
        );

        Ok(Self {
            session: Some(session),
            config,
            input_name,
            output_names,
            input_size,
            layout,
            previous_roi: None,
            mask: None,
            warmed_up: false,
        })
    }

    /// Run the model once on a blank input.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the estimator was released.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }
        let start = Instant::now();
        let dummy = match self.layout {
            TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, self.input_size, self.input_size)),
            TensorLayout::Nhwc => Array4::<f32>::zeros((1, self.input_size, self.input_size, 3)),
        };
        let _ = self.run(&dummy)?;
        self.warmed_up = true;
        verbose!("Warmup done in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
        Ok(())
    }

    /// The estimator's configuration.
    #[must_use]
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<ModelOutput> {
        let session = self.session.as_mut().ok_or(PoseError::Released)?;

        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
            PoseError::InferenceError(format!("Failed to create input tensor: {e}"))
        })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PoseError::InferenceError(format!("Inference failed: {e}")))?;

        let mut result = ModelOutput::default();
        for name in &self.output_names {
            let Some(value) = outputs.get(name.as_str()) else {
                continue;
            };
            if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
                result.absorb(data, self.input_size);
            }
        }
        Ok(result)
    }

    /// Run the model on `roi` and return the output if the body is present.
    fn attempt(&mut self, image: &RgbImage, roi: &Roi, threshold: f32) -> Result<Option<ModelOutput>> {
        let tensor = crop_to_tensor(image, roi, self.input_size, self.layout);
        let output = self.run(&tensor)?;
        if output.landmarks.is_none() {
            return Err(PoseError::InferenceError(format!(
                "Model produced no {RAW_LANDMARKS}x{LANDMARK_STRIDE} landmark output"
            )));
        }
        let score = output.presence_score(self.config.presence_output);
        Ok((score >= threshold).then_some(output))
    }

    fn accept(&mut self, image: &RgbImage, roi: Roi, output: &ModelOutput) -> Result<LandmarkSet> {
        let data = output.landmarks.as_deref().unwrap_or_default();
        let (set, next) = decode_landmarks(data, &roi, self.input_size, image.width(), image.height())?;

        self.previous_roi = match self.config.tracking_mode {
            TrackingMode::Continuous => next,
            TrackingMode::Static => None,
        };

        self.mask = if self.config.enable_segmentation {
            output
                .segmentation
                .as_deref()
                .map(|seg| SegmentationMask {
                    mask: segmentation_to_mask(seg, self.input_size),
                    roi,
                })
        } else {
            None
        };

        Ok(set)
    }
}

impl PoseEstimator for BlazePoseEstimator {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        if self.session.is_none() {
            return Err(PoseError::Released);
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(PoseError::ImageError("Empty frame".to_string()));
        }
        self.warmup()?;

        if let Some(roi) = self.previous_roi.take() {
            let threshold = self.config.min_tracking_confidence;
            if let Some(output) = self.attempt(image, &roi, threshold)? {
                return self.accept(image, roi, &output).map(Some);
            }
            verbose!("Track lost, searching full frame");
        }

        let roi = Roi::full_frame(image.width(), image.height());
        let threshold = self.config.min_detection_confidence;
        match self.attempt(image, &roi, threshold)? {
            Some(output) => self.accept(image, roi, &output).map(Some),
            None => {
                self.mask = None;
                Ok(None)
            }
        }
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            verbose!("Pose estimator released");
        }
        self.previous_roi = None;
        self.mask = None;
    }

    fn is_released(&self) -> bool {
        self.session.is_none()
    }

    fn segmentation_mask(&self) -> Option<&SegmentationMask> {
        self.mask.as_ref()
    }
}

impl std::fmt::Debug for BlazePoseEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlazePoseEstimator")
            .field("model", &self.config.model_path())
            .field("tracking_mode", &self.config.tracking_mode)
            .field("input_size", &self.input_size)
            .field("layout", &self.layout)
            .field("released", &self.session.is_none())
            .finish_non_exhaustive()
    }
}

/// Create an ONNX Runtime session with the enabled execution providers.
fn build_session(path: &Path, num_threads: usize) -> Result<Session> {
    #[allow(unused_mut)]
    let mut builder = Session::builder().map_err(|e| {
        PoseError::ModelLoadError(format!("Failed to create session builder: {e}"))
    })?;

    #[cfg(feature = "cuda")]
    {
        builder = builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to register CUDA EP: {e}")))?;
    }

    #[cfg(feature = "coreml")]
    {
        builder = builder
            .with_execution_providers([CoreMLExecutionProvider::default()
                .with_subgraphs(true)
                .build()])
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to register CoreML EP: {e}")))?;
    }

    builder
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
        .map_err(|e| PoseError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
        .with_intra_threads(num_threads)
        .map_err(|e| PoseError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
        .commit_from_file(path)
        .map_err(|e| PoseError::ModelLoadError(format!("Failed to load model: {e}")))
}

/// Layout and side length of a square image input shape.
fn input_geometry(shape: &[i64]) -> (TensorLayout, usize) {
    let side = |d: i64| usize::try_from(d).ok().filter(|&s| s > 0).unwrap_or(DEFAULT_INPUT_SIZE);
    match shape {
        [_, 3, h, _] => (TensorLayout::Nchw, side(*h)),
        [_, h, _, _] => (TensorLayout::Nhwc, side(*h)),
        _ => (TensorLayout::Nhwc, DEFAULT_INPUT_SIZE),
    }
}

/// Map raw model landmarks in `roi` back to normalized frame coordinates.
///
/// Also returns the crop to use on the next frame, derived from the
/// alignment points.
fn decode_landmarks(
    data: &[f32],
    roi: &Roi,
    input_size: usize,
    frame_width: u32,
    frame_height: u32,
) -> Result<(LandmarkSet, Option<Roi>)> {
    if data.len() < RAW_LANDMARKS * LANDMARK_STRIDE {
        return Err(PoseError::InferenceError(format!(
            "Expected {} landmark values, got {}",
            RAW_LANDMARKS * LANDMARK_STRIDE,
            data.len()
        )));
    }

    let (w, h) = (frame_width as f32, frame_height as f32);
    let depth_scale = roi.size / input_size as f32 / w;
    let raw = |i: usize| &data[i * LANDMARK_STRIDE..(i + 1) * LANDMARK_STRIDE];

    let mut points = [Landmark::default(); NUM_LANDMARKS];
    for (i, point) in points.iter_mut().enumerate() {
        let v = raw(i);
        let (fx, fy) = roi.to_frame(v[0], v[1], input_size);
        *point = Landmark::new(fx / w, fy / h, v[2] * depth_scale).with_visibility(sigmoid(v[3]));
    }

    let center = raw(ALIGN_CENTER);
    let scale = raw(ALIGN_SCALE);
    let next = Roi::from_alignment(
        roi.to_frame(center[0], center[1], input_size),
        roi.to_frame(scale[0], scale[1], input_size),
    );

    Ok((LandmarkSet::new(points), next))
}

/// Convert segmentation logits to an 8-bit mask.
fn segmentation_to_mask(data: &[f32], size: usize) -> GrayImage {
    let side = size as u32;
    GrayImage::from_fn(side, side, |x, y| {
        let v = data[y as usize * size + x as usize];
        Luma([(sigmoid(v) * 255.0).round() as u8])
    })
}
