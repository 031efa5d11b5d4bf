// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pipeline and estimator configuration.
//!
//! Configuration is resolved once at startup and read-only afterwards. Both
//! [`PipelineConfig`] and [`EstimatorConfig`] use a builder pattern:
//!
//! ```rust
//! use pose_visualizer::{EstimatorConfig, Fidelity, PipelineConfig, RenderMode};
//!
//! let config = PipelineConfig::video_overlay("video.mp4")
//!     .with_mode(RenderMode::Both)
//!     .with_frame_skip(2)
//!     .with_estimator(EstimatorConfig::new().with_fidelity(Fidelity::High));
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PoseError, Result};
use crate::source::{CaptureRequest, Source};
use crate::topology::Topology;
use crate::visualizer::overlay::OverlayStyle;
use crate::visualizer::scene::SceneView;

/// Whether the estimator may reuse the previous frame's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// Every image is treated independently.
    Static,
    /// The previous frame's landmarks bias the next detection.
    /// Frames must come from one stream, in order.
    #[default]
    Continuous,
}

/// Accuracy/latency trade-off of the pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fidelity {
    /// Fastest, least accurate.
    Low,
    /// Balanced speed and accuracy.
    #[default]
    Balanced,
    /// Slowest, most accurate.
    High,
}

impl Fidelity {
    /// Model file name for this fidelity level.
    #[must_use]
    pub const fn model_file(self) -> &'static str {
        match self {
            Self::Low => "pose_landmark_lite.onnx",
            Self::Balanced => "pose_landmark_full.onnx",
            Self::High => "pose_landmark_heavy.onnx",
        }
    }

    /// String representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Balanced => "balanced",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Fidelity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Fidelity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "lite" | "0" => Ok(Self::Low),
            "balanced" | "full" | "1" => Ok(Self::Balanced),
            "high" | "heavy" | "2" => Ok(Self::High),
            _ => Err(format!("Unknown fidelity: {s}")),
        }
    }
}

/// Scale of the model's pose presence output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceOutput {
    /// Already a probability in `[0, 1]`.
    #[default]
    Probability,
    /// A raw score that still needs a sigmoid.
    Logit,
}

impl FromStr for PresenceOutput {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "probability" | "prob" => Ok(Self::Probability),
            "logit" => Ok(Self::Logit),
            _ => Err(format!("Unknown presence output: {s}")),
        }
    }
}

/// Configuration for the pose estimator.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Explicit model path. When `None`, the fidelity's model file is looked up in `model_dir`.
    pub model: Option<PathBuf>,
    /// Directory holding the model files.
    pub model_dir: PathBuf,
    /// Static or continuous tracking.
    pub tracking_mode: TrackingMode,
    /// Model fidelity level.
    pub fidelity: Fidelity,
    /// Minimum presence score for a detection on a full frame (0.0 to 1.0).
    pub min_detection_confidence: f32,
    /// Minimum presence score to keep following a tracked body (0.0 to 1.0).
    pub min_tracking_confidence: f32,
    /// Keep the model's segmentation mask of the last detection.
    pub enable_segmentation: bool,
    /// Whether the presence output needs a sigmoid.
    pub presence_output: PresenceOutput,
    /// Intra-op threads for ONNX Runtime. `0` lets ONNX Runtime decide.
    pub num_threads: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            model: None,
            model_dir: PathBuf::from("models"),
            tracking_mode: TrackingMode::Continuous,
            fidelity: Fidelity::Balanced,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            enable_segmentation: false,
            presence_output: PresenceOutput::Probability,
            num_threads: 0,
        }
    }
}

impl EstimatorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit model file.
    #[must_use]
    pub fn with_model<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model = Some(path.into());
        self
    }

    /// Set the directory searched for the fidelity's model file.
    #[must_use]
    pub fn with_model_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Set the tracking mode.
    #[must_use]
    pub const fn with_tracking_mode(mut self, mode: TrackingMode) -> Self {
        self.tracking_mode = mode;
        self
    }

    /// Set the fidelity level.
    #[must_use]
    pub const fn with_fidelity(mut self, fidelity: Fidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    /// Set the detection confidence threshold.
    #[must_use]
    pub const fn with_detection_confidence(mut self, threshold: f32) -> Self {
        self.min_detection_confidence = threshold;
        self
    }

    /// Set the tracking confidence threshold.
    #[must_use]
    pub const fn with_tracking_confidence(mut self, threshold: f32) -> Self {
        self.min_tracking_confidence = threshold;
        self
    }

    /// Enable or disable keeping the segmentation mask.
    #[must_use]
    pub const fn with_segmentation(mut self, enable: bool) -> Self {
        self.enable_segmentation = enable;
        self
    }

    /// Set the scale of the presence output.
    #[must_use]
    pub const fn with_presence_output(mut self, presence: PresenceOutput) -> Self {
        self.presence_output = presence;
        self
    }

    /// Set the number of intra-op threads.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Path of the model file to load.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.model
            .clone()
            .unwrap_or_else(|| self.model_dir.join(self.fidelity.model_file()))
    }

    /// Check thresholds.
    ///
    /// # Errors
    ///
    /// Returns a [`PoseError::ConfigError`] for thresholds outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PoseError::ConfigError(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A key that ends the run when pressed in any window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitKey {
    /// The escape key.
    Escape,
    /// A character key (case-insensitive).
    Char(char),
}

impl fmt::Display for QuitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Escape => write!(f, "ESC"),
            Self::Char(c) => write!(f, "'{c}'"),
        }
    }
}

/// Which renderers are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Skeleton drawn over the source frames.
    #[default]
    Overlay,
    /// Rotating 3D scene, with an optional raw preview of the source.
    Scene,
    /// Overlay window and 3D scene together.
    Both,
    /// One still image: overlay, annotated file, wait for a key.
    StillImage,
}

impl RenderMode {
    /// Whether the 2D overlay renderer draws landmarks.
    #[must_use]
    pub const fn has_overlay(self) -> bool {
        matches!(self, Self::Overlay | Self::Both | Self::StillImage)
    }

    /// Whether the 3D scene renderer is active.
    #[must_use]
    pub const fn has_scene(self) -> bool {
        matches!(self, Self::Scene | Self::Both)
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "2d" | "overlay" => Ok(Self::Overlay),
            "3d" | "scene" => Ok(Self::Scene),
            "both" => Ok(Self::Both),
            "image" => Ok(Self::StillImage),
            _ => Err(format!("Unknown render mode: {s}")),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where frames come from.
    pub source: Source,
    /// Requested capture resolution and rate for camera sources.
    pub capture: Option<CaptureRequest>,
    /// Active renderers.
    pub mode: RenderMode,
    /// Estimator settings.
    pub estimator: EstimatorConfig,
    /// Size of the 2D window (width, height); frames are resized to it.
    pub overlay_size: (u32, u32),
    /// Size of the 3D scene canvas (width, height).
    pub scene_size: (u32, u32),
    /// Show unannotated source frames next to the 3D scene.
    pub preview: bool,
    /// Draw the instantaneous frame rate on the 2D window.
    pub show_fps: bool,
    /// Process every Nth frame. Skipped frames are still read.
    pub frame_skip: usize,
    /// Keys that end the run.
    pub quit_keys: Vec<QuitKey>,
    /// How long each quit-key poll waits.
    pub poll_interval: Duration,
    /// Landmark and bone styling of the 2D overlay.
    pub overlay_style: OverlayStyle,
    /// Bones drawn on the 2D overlay.
    pub overlay_topology: Topology,
    /// Bones plotted in the 3D scene.
    pub scene_topology: Topology,
    /// Fixed camera and axis bounds of the 3D scene.
    pub view: SceneView,
    /// Title of the 2D window.
    pub overlay_title: String,
    /// Directory for the annotated still image.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: Source::Webcam(0),
            capture: None,
            mode: RenderMode::Overlay,
            estimator: EstimatorConfig::default(),
            overlay_size: (960, 540),
            scene_size: (1000, 800),
            preview: true,
            show_fps: false,
            frame_skip: 1,
            quit_keys: vec![QuitKey::Escape, QuitKey::Char('q')],
            poll_interval: Duration::from_millis(1),
            overlay_style: OverlayStyle::default(),
            overlay_topology: Topology::full(),
            scene_topology: Topology::body(),
            view: SceneView::default(),
            overlay_title: "Pose Tracking".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live camera with a 960x540 overlay and a frame-rate readout.
    #[must_use]
    pub fn webcam_overlay(index: u32) -> Self {
        Self {
            source: Source::Webcam(index),
            capture: Some(CaptureRequest::DEFAULT),
            show_fps: true,
            overlay_title: "Real-time Pose Tracking (960x540)".to_string(),
            ..Self::default()
        }
    }

    /// Video file with a 484x692 overlay.
    #[must_use]
    pub fn video_overlay<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: Source::Video(path.as_ref().to_path_buf()),
            overlay_size: (484, 692),
            overlay_title: "Pose Tracking (Video)".to_string(),
            ..Self::default()
        }
    }

    /// Video file plotted in 3D, every second frame, with a raw preview.
    #[must_use]
    pub fn video_scene<P: AsRef<Path>>(path: P) -> Self {
        Self {
            mode: RenderMode::Scene,
            frame_skip: 2,
            ..Self::video_overlay(path)
        }
        .with_title("Video")
    }

    /// Video file with both the overlay and the 3D scene.
    #[must_use]
    pub fn video_scene_and_overlay<P: AsRef<Path>>(path: P) -> Self {
        Self {
            mode: RenderMode::Both,
            overlay_size: (640, 360),
            ..Self::video_overlay(path)
        }
    }

    /// One still image, annotated and written next to the working directory.
    #[must_use]
    pub fn still_image<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: Source::Image(path.as_ref().to_path_buf()),
            mode: RenderMode::StillImage,
            estimator: EstimatorConfig::default().with_tracking_mode(TrackingMode::Static),
            overlay_size: (484, 692),
            overlay_style: OverlayStyle::still_image(),
            overlay_title: "Pose Tracking (Image)".to_string(),
            ..Self::default()
        }
    }

    /// Set the source.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Set the render mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the estimator configuration.
    #[must_use]
    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    /// Set the 2D window size.
    #[must_use]
    pub const fn with_overlay_size(mut self, width: u32, height: u32) -> Self {
        self.overlay_size = (width, height);
        self
    }

    /// Set the 3D canvas size.
    #[must_use]
    pub const fn with_scene_size(mut self, width: u32, height: u32) -> Self {
        self.scene_size = (width, height);
        self
    }

    /// Enable or disable the raw preview next to the 3D scene.
    #[must_use]
    pub const fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Enable or disable the frame-rate readout.
    #[must_use]
    pub const fn with_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Process every `n`th frame.
    #[must_use]
    pub const fn with_frame_skip(mut self, n: usize) -> Self {
        self.frame_skip = n;
        self
    }

    /// Set the quit keys.
    #[must_use]
    pub fn with_quit_keys(mut self, keys: Vec<QuitKey>) -> Self {
        self.quit_keys = keys;
        self
    }

    /// Set the 2D window title.
    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.overlay_title = title.to_string();
        self
    }

    /// Set the output directory of the annotated still image.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the camera capture request.
    #[must_use]
    pub const fn with_capture(mut self, capture: Option<CaptureRequest>) -> Self {
        self.capture = capture;
        self
    }

    /// Check the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a [`PoseError::ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.frame_skip == 0 {
            return Err(PoseError::ConfigError(
                "frame_skip must be at least 1".to_string(),
            ));
        }
        for (name, (w, h)) in [
            ("overlay_size", self.overlay_size),
            ("scene_size", self.scene_size),
        ] {
            if w == 0 || h == 0 {
                return Err(PoseError::ConfigError(format!(
                    "{name} must be non-zero, got {w}x{h}"
                )));
            }
        }
        if self.quit_keys.is_empty() {
            return Err(PoseError::ConfigError(
                "at least one quit key is required".to_string(),
            ));
        }
        if self.mode == RenderMode::StillImage && !matches!(self.source, Source::Image(_)) {
            return Err(PoseError::ConfigError(
                "still image mode requires an image source".to_string(),
            ));
        }
        self.estimator.validate()
    }
}
