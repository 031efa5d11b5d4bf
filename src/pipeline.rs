// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The per-frame visualization loop.
//!
//! A [`Pipeline`] reads frames from a source, estimates the pose on every Nth
//! frame, and renders the result to the overlay window, the 3D scene, or both.
//! It moves through [`PipelineState`]s:
//!
//! ```text
//! Init -> Running -> Draining -> Stopped
//!   \        \                 ^
//!    `--------`-> Failed ------'  (through Draining)
//! ```
//!
//! Every run ends in `Stopped` with the source closed, the estimator released
//! and the windows closed exactly once, whichever path it took.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ab_glyph::FontArc;

use crate::config::{EstimatorConfig, PipelineConfig, QuitKey, RenderMode};
use crate::error::{PoseError, Result};
use crate::estimator::{self, PoseEstimator};
use crate::io::{annotated_output_path, save_annotated};
use crate::source::{self, CaptureRequest, Frame, FrameSource, Source};
use crate::transform::{to_pixel_space, to_scene_space};
use crate::visualizer::overlay::{FpsMeter, OverlayRenderer, draw_fps, resize_for_display};
use crate::visualizer::scene::SceneRenderer;
use crate::visualizer::surface::{HeadlessSurface, Surface};
use crate::{info, section, success, verbose, warn};

/// Title of the 3D scene window.
pub const SCENE_WINDOW_TITLE: &str = "3D Pose Skeleton";

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Opening the source, estimator and windows.
    Init,
    /// Processing frames.
    Running,
    /// Releasing resources.
    Draining,
    /// A fatal error occurred.
    Failed,
    /// All resources released. Terminal.
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Running => "RUNNING",
            Self::Draining => "DRAINING",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of frames.
    EndOfStream,
    /// A quit key was pressed or a window was closed.
    Quit,
    /// A fatal error ended the run.
    Failed,
}

/// Counters and outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Frames read from the source.
    pub frames_consumed: usize,
    /// Frames passed to the estimator.
    pub frames_processed: usize,
    /// Processed frames with a detected body.
    pub detections: usize,
    /// Frames the overlay drew a skeleton on.
    pub overlay_draws: usize,
    /// Frames the segmentation mask was tinted on.
    pub mask_draws: usize,
    /// Times the 3D scene was cleared and redrawn.
    pub scene_redraws: usize,
    /// Total time spent in the estimator.
    pub inference_time: Duration,
    /// Annotated still image written during the run.
    pub output: Option<PathBuf>,
    /// Frame rate reported by the source, when it has one.
    pub source_fps: Option<f32>,
    /// Why the run ended, once it has.
    pub stop_reason: Option<StopReason>,
    /// Every state entered, in order.
    pub states: Vec<PipelineState>,
}

impl RunReport {
    /// Mean estimator latency in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_inference_ms(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        self.inference_time.as_secs_f64() * 1000.0 / self.frames_processed as f64
    }
}

/// Which window a surface is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    /// Source frames, annotated or raw.
    Overlay,
    /// The 3D scene canvas.
    Scene,
}

/// Opens the pipeline's collaborators.
pub trait Backend {
    /// Open the frame source.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::SourceUnavailable`] if it cannot be opened.
    fn open_source(
        &mut self,
        source: &Source,
        capture: Option<CaptureRequest>,
    ) -> Result<Box<dyn FrameSource>>;

    /// Load the pose estimator.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    fn open_estimator(&mut self, config: &EstimatorConfig) -> Result<Box<dyn PoseEstimator>>;

    /// Open a display surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created.
    fn open_surface(
        &mut self,
        role: SurfaceRole,
        title: &str,
        size: (u32, u32),
        quit_keys: &[QuitKey],
    ) -> Result<Box<dyn Surface>>;

    /// Font for on-screen text.
    fn font(&mut self) -> Option<FontArc> {
        None
    }
}

/// Real sources, the ONNX estimator and native windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend {
    headless: bool,
}

impl NativeBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self { headless: false }
    }

    /// Run without windows.
    #[must_use]
    pub const fn headless() -> Self {
        Self { headless: true }
    }
}

impl Backend for NativeBackend {
    fn open_source(
        &mut self,
        source: &Source,
        capture: Option<CaptureRequest>,
    ) -> Result<Box<dyn FrameSource>> {
        source::open_source(source, capture)
    }

    fn open_estimator(&mut self, config: &EstimatorConfig) -> Result<Box<dyn PoseEstimator>> {
        estimator::open_estimator(config)
    }

    fn open_surface(
        &mut self,
        _role: SurfaceRole,
        title: &str,
        size: (u32, u32),
        quit_keys: &[QuitKey],
    ) -> Result<Box<dyn Surface>> {
        if self.headless {
            return Ok(Box::new(HeadlessSurface::new()));
        }
        open_window(title, size, quit_keys)
    }

    fn font(&mut self) -> Option<FontArc> {
        crate::visualizer::font::default_font()
    }
}

#[cfg(feature = "visualize")]
fn open_window(title: &str, size: (u32, u32), quit_keys: &[QuitKey]) -> Result<Box<dyn Surface>> {
    let viewer =
        crate::visualizer::Viewer::new(title, size.0 as usize, size.1 as usize, quit_keys)?;
    Ok(Box::new(viewer))
}

#[cfg(not(feature = "visualize"))]
fn open_window(_title: &str, _size: (u32, u32), _quit_keys: &[QuitKey]) -> Result<Box<dyn Surface>> {
    Err(PoseError::FeatureNotEnabled(
        "windows require the 'visualize' feature; run headless instead".to_string(),
    ))
}

/// Drives frames from a source through the estimator to the renderers.
pub struct Pipeline<B: Backend = NativeBackend> {
    config: PipelineConfig,
    backend: B,
    state: PipelineState,
    report: RunReport,
    source: Option<Box<dyn FrameSource>>,
    estimator: Option<Box<dyn PoseEstimator>>,
    overlay_surface: Option<Box<dyn Surface>>,
    scene_surface: Option<Box<dyn Surface>>,
    overlay: OverlayRenderer,
    scene: Option<SceneRenderer>,
    fps: FpsMeter,
    font: Option<FontArc>,
}

impl Pipeline<NativeBackend> {
    /// Create a pipeline with the native backend.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_backend(config, NativeBackend::new())
    }
}

impl<B: Backend> Pipeline<B> {
    /// Create a pipeline that opens its collaborators through `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the configuration is invalid.
    pub fn with_backend(config: PipelineConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let overlay = OverlayRenderer::new(config.overlay_style);
        Ok(Self {
            config,
            backend,
            state: PipelineState::Init,
            report: RunReport {
                states: vec![PipelineState::Init],
                ..RunReport::default()
            },
            source: None,
            estimator: None,
            overlay_surface: None,
            scene_surface: None,
            overlay,
            scene: None,
            fps: FpsMeter::new(),
            font: None,
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Counters so far. Complete once the pipeline is stopped.
    #[must_use]
    pub const fn report(&self) -> &RunReport {
        &self.report
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Run until end of stream, a quit key, or a fatal error.
    ///
    /// Resources are released before returning on every path.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that ended the run, such as
    /// [`PoseError::SourceUnavailable`] or [`PoseError::ReadFailure`]. Calling
    /// `run` again after it returned is a [`PoseError::ConfigError`].
    pub fn run(&mut self) -> Result<RunReport> {
        if self.state != PipelineState::Init {
            return Err(PoseError::ConfigError(format!(
                "pipeline cannot run from state {}",
                self.state
            )));
        }

        let outcome = self.init().and_then(|()| {
            self.transition(PipelineState::Running);
            self.run_loop()
        });

        let failure = match outcome {
            Ok(reason) => {
                self.report.stop_reason = Some(reason);
                None
            }
            Err(e) => {
                self.report.stop_reason = Some(StopReason::Failed);
                self.transition(PipelineState::Failed);
                Some(e)
            }
        };

        self.drain();
        self.log_summary();

        match failure {
            Some(e) => Err(e),
            None => Ok(self.report.clone()),
        }
    }

    fn transition(&mut self, next: PipelineState) {
        verbose!("{} -> {next}", self.state);
        self.state = next;
        self.report.states.push(next);
    }

    fn init(&mut self) -> Result<()> {
        let config = &self.config;
        section!("Pose visualizer");
        info!("Source: {}", config.source.describe());
        info!("Mode: {:?}, processing {}", config.mode, skip_label(config.frame_skip));

        let source = self.backend.open_source(&config.source, config.capture)?;
        self.report.source_fps = source.fps();
        if let Some(fps) = self.report.source_fps {
            info!("Video FPS: {fps}");
        }
        self.source = Some(source);
        self.estimator = Some(self.backend.open_estimator(&config.estimator)?);

        let wants_text = config.show_fps || config.mode.has_scene();
        self.font = if wants_text { self.backend.font() } else { None };

        let shows_frames =
            config.mode.has_overlay() || (config.mode == RenderMode::Scene && config.preview);
        if shows_frames {
            self.overlay_surface = Some(self.backend.open_surface(
                SurfaceRole::Overlay,
                &config.overlay_title,
                config.overlay_size,
                &config.quit_keys,
            )?);
        }

        if config.mode.has_scene() {
            let renderer = SceneRenderer::new(config.view, config.scene_size);
            self.scene = Some(renderer.with_font(self.font.clone()));
            self.scene_surface = Some(self.backend.open_surface(
                SurfaceRole::Scene,
                SCENE_WINDOW_TITLE,
                config.scene_size,
                &config.quit_keys,
            )?);
        }

        let keys: Vec<String> = self.config.quit_keys.iter().map(ToString::to_string).collect();
        info!("Press {} to quit", keys.join(" or "));
        self.fps.start(Instant::now());
        Ok(())
    }

    fn run_loop(&mut self) -> Result<StopReason> {
        loop {
            let source = self
                .source
                .as_mut()
                .ok_or_else(|| PoseError::ReadFailure("source is not open".to_string()))?;
            let Some(frame) = source.next_frame()? else {
                verbose!("End of stream after {} frames", self.report.frames_consumed);
                return Ok(StopReason::EndOfStream);
            };

            self.report.frames_consumed += 1;
            if self.report.frames_consumed % self.config.frame_skip != 0 {
                continue;
            }
            self.report.frames_processed += 1;

            self.process(frame)?;

            if self.config.mode == RenderMode::StillImage {
                if let Some(surface) = self.overlay_surface.as_mut() {
                    surface.wait_until_quit();
                }
                continue;
            }

            if self.poll_quit() {
                verbose!("Quit requested");
                return Ok(StopReason::Quit);
            }
        }
    }

    /// Estimate, transform and render one frame.
    fn process(&mut self, frame: Frame) -> Result<()> {
        let Frame { mut image, index } = frame;
        let estimator = self.estimator.as_mut().ok_or(PoseError::Released)?;

        let start = Instant::now();
        let detection = estimator.detect(&image)?;
        self.report.inference_time += start.elapsed();
        let mask = estimator
            .segmentation_mask()
            .map(|m| m.to_frame(image.width(), image.height()));

        if detection.is_some() {
            self.report.detections += 1;
        } else {
            verbose!("Frame {index}: no detection");
        }

        let pixels = detection
            .as_ref()
            .map(|set| to_pixel_space(set, image.width(), image.height()));
        let scene_points = detection.as_ref().map(to_scene_space);

        if self.config.mode.has_overlay()
            && let Some(mask) = mask.as_ref()
            && self.overlay.draw_mask(&mut image, mask)
        {
            self.report.mask_draws += 1;
        }

        if self.config.mode.has_overlay()
            && self
                .overlay
                .draw(&mut image, pixels.as_deref(), &self.config.overlay_topology)
        {
            self.report.overlay_draws += 1;
        }

        if self.config.mode == RenderMode::StillImage && detection.is_some() {
            let path = self.config.source.path().map_or_else(
                || PathBuf::from("image"),
                std::path::Path::to_path_buf,
            );
            let output = annotated_output_path(&path, &self.config.output_dir);
            if tolerate(save_annotated(&image, &output))?.is_some() {
                success!("Output image saved as '{}'", output.display());
                self.report.output = Some(output);
            }
        }

        if let Some(surface) = self.overlay_surface.as_mut() {
            let mut display = resize_for_display(&image, self.config.overlay_size);
            let fps = self.fps.tick(Instant::now());
            if self.config.show_fps
                && let (Some(fps), Some(font)) = (fps, self.font.as_ref())
            {
                draw_fps(&mut display, fps, font);
            }
            tolerate(surface.present(&display))?;
        }

        if let Some(scene) = self.scene.as_mut()
            && scene.redraw(scene_points.as_deref(), &self.config.scene_topology)
        {
            self.report.scene_redraws += 1;
            if let Some(surface) = self.scene_surface.as_mut() {
                tolerate(surface.present(scene.canvas()))?;
            }
        }

        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        let timeout = self.config.poll_interval;
        let overlay = self
            .overlay_surface
            .as_mut()
            .is_some_and(|s| s.poll_quit(timeout));
        overlay
            || self
                .scene_surface
                .as_mut()
                .is_some_and(|s| s.poll_quit(timeout))
    }

    /// Release everything that was opened and stop.
    fn drain(&mut self) {
        self.transition(PipelineState::Draining);
        self.release_resources();
        verbose!("Released source, estimator and windows");
        self.transition(PipelineState::Stopped);
    }

    fn release_resources(&mut self) {
        if let Some(mut estimator) = self.estimator.take() {
            estimator.release();
        }
        if let Some(mut source) = self.source.take() {
            source.close();
        }
        for mut surface in [self.overlay_surface.take(), self.scene_surface.take()]
            .into_iter()
            .flatten()
        {
            surface.close();
        }
    }

    fn log_summary(&self) {
        let r = &self.report;
        info!(
            "{} frames read, {} processed, {} with a body, {:.1}ms mean inference",
            r.frames_consumed,
            r.frames_processed,
            r.detections,
            r.mean_inference_ms()
        );
    }
}

impl<B: Backend> Drop for Pipeline<B> {
    fn drop(&mut self) {
        self.release_resources();
    }
}

impl<B: Backend> fmt::Debug for Pipeline<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state)
            .field("mode", &self.config.mode)
            .field("source", &self.config.source)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

/// Downgrade per-frame errors to warnings.
///
/// Returns `Ok(None)` for a downgraded error.
fn tolerate<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if !e.is_fatal() => {
            warn!("{e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// "every frame", "every 2nd frame", "every 11th frame", ...
fn skip_label(n: usize) -> String {
    if n == 1 {
        return "every frame".to_string();
    }
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("every {n}{suffix} frame")
}
