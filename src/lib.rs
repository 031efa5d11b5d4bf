// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Visualizer
//!
//! Real-time human pose skeleton visualization written in Rust. Frames from a
//! camera, a video file or a still image go through a 33-landmark pose model
//! running on ONNX Runtime, and the detected skeleton is drawn over the frame,
//! plotted in a fixed-camera 3D scene, or both.
//!
//! ## Features
//!
//! - **33 Landmarks** - Full-body topology with per-landmark visibility
//! - **ONNX Runtime** - Cross-platform inference with optional CUDA and `CoreML`
//! - **Continuous Tracking** - The previous detection steers the next crop
//! - **2D Overlay** - Skeleton drawn over the source frame with an FPS readout
//! - **3D Scene** - Fixed-camera orthographic plot of the body skeleton
//! - **Multiple Sources** - Capture devices, video files and still images
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_visualizer::{Pipeline, PipelineConfig, RenderMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::video_overlay("dance.mp4").with_mode(RenderMode::Both);
//!     let report = Pipeline::new(config)?.run()?;
//!
//!     println!(
//!         "{} of {} frames processed, {} detections",
//!         report.frames_processed, report.frames_consumed, report.detections
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Running the Estimator Directly
//!
//! ```no_run
//! use pose_visualizer::{BlazePoseEstimator, BodyLandmark, EstimatorConfig, PoseEstimator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut estimator = BlazePoseEstimator::load(EstimatorConfig::new())?;
//! let image = image::open("football.jpeg")?.to_rgb8();
//! if let Some(landmarks) = estimator.detect(&image)? {
//!     let nose = landmarks.get(BodyLandmark::Nose);
//!     println!("nose at ({:.3}, {:.3})", nose.x, nose.y);
//! }
//! estimator.release();
//! # Ok(())
//! # }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Webcam with a 960x540 overlay and FPS readout
//! pose-visualizer stream --source 0 --fps
//!
//! # Video file plotted in 3D, every second frame
//! pose-visualizer stream --source video.mp4 --mode 3d
//!
//! # Annotate one image and write <name>_output_pose.jpg
//! pose-visualizer image --source football.jpeg
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pipeline`] | [`Pipeline`] state machine driving source, estimator and renderers |
//! | [`estimator`] | [`PoseEstimator`] trait and the ONNX [`BlazePoseEstimator`] |
//! | [`source`] | Frame sources ([`Source`], [`FrameSource`]) |
//! | [`landmarks`] | [`LandmarkSet`] and the named [`BodyLandmark`] indices |
//! | [`topology`] | Bone lists ([`Topology`]) |
//! | [`transform`] | Pixel and scene coordinate transforms |
//! | [`visualizer`] | 2D overlay, 3D scene, windows |
//! | [`config`] | [`PipelineConfig`] and [`EstimatorConfig`] |
//! | [`error`] | Error types ([`PoseError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `visualize` | Native display windows (default) |
//! | `video` | Video files and capture devices through FFmpeg (default) |
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `coreml` | Apple `CoreML` (macOS/iOS) |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod cli;
pub mod config;
pub mod error;
pub mod estimator;
pub mod io;
pub mod landmarks;
pub mod logging;
pub mod pipeline;
pub mod preprocessing;
pub mod source;
pub mod topology;
pub mod transform;
pub mod visualizer;

// Re-export main types for convenience
pub use config::{
    EstimatorConfig, Fidelity, PipelineConfig, PresenceOutput, QuitKey, RenderMode, TrackingMode,
};
pub use error::{PoseError, Result};
pub use estimator::{BlazePoseEstimator, PoseEstimator, SegmentationMask};
pub use landmarks::{BodyLandmark, BodySide, Landmark, LandmarkSet, NUM_LANDMARKS};
pub use pipeline::{
    Backend, NativeBackend, Pipeline, PipelineState, RunReport, StopReason, SurfaceRole,
};
pub use source::{CaptureRequest, Frame, FrameSource, Source};
pub use topology::Topology;
pub use transform::{PixelPoint, ScenePoint, to_pixel_space, to_scene_space};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
