// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the pose visualization pipeline.
//!
//! The pipeline is driven through a scripted [`Backend`], so no model file,
//! camera or window is needed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use image::{GrayImage, Luma, Rgb, RgbImage};
use pose_visualizer::preprocessing::Roi;
use pose_visualizer::source::StillImageSource;
use pose_visualizer::visualizer::{HeadlessSurface, Surface};
use pose_visualizer::{
    Backend, CaptureRequest, EstimatorConfig, Frame, FrameSource, Landmark, LandmarkSet,
    NUM_LANDMARKS, Pipeline, PipelineConfig, PipelineState, PoseError, PoseEstimator, QuitKey,
    RenderMode, Result, SegmentationMask, Source, StopReason, SurfaceRole,
};

/// What the source yields on each read.
#[derive(Debug, Clone, Copy)]
enum Read {
    Frame,
    Fail,
}

#[derive(Debug, Default)]
struct Log {
    sources_opened: usize,
    estimators_opened: usize,
    surfaces_opened: Vec<SurfaceRole>,
    reads: usize,
    detects: usize,
    presents: usize,
    source_closed: usize,
    released: usize,
    surfaces_closed: usize,
}

type Shared = Rc<RefCell<Log>>;

fn body() -> LandmarkSet {
    let mut points = [Landmark::default(); NUM_LANDMARKS];
    for (i, p) in points.iter_mut().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f32 / NUM_LANDMARKS as f32;
        *p = Landmark::new(0.3 + 0.4 * t, 0.1 + 0.8 * t, -0.1 + 0.2 * t);
    }
    LandmarkSet::new(points)
}

struct ScriptedSource {
    reads: VecDeque<Read>,
    index: usize,
    fps: Option<f32>,
    log: Shared,
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.log.borrow_mut().reads += 1;
        match self.reads.pop_front() {
            Some(Read::Frame) => {
                let frame = Frame::new(RgbImage::from_pixel(64, 48, Rgb([20, 20, 20])), self.index);
                self.index += 1;
                Ok(Some(frame))
            }
            Some(Read::Fail) => Err(PoseError::ReadFailure("device unplugged".to_string())),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.log.borrow_mut().source_closed += 1;
    }

    fn fps(&self) -> Option<f32> {
        self.fps
    }
}

struct ScriptedEstimator {
    hits: VecDeque<bool>,
    mask: Option<SegmentationMask>,
    released: bool,
    log: Shared,
}

impl PoseEstimator for ScriptedEstimator {
    fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>> {
        if self.released {
            return Err(PoseError::Released);
        }
        self.log.borrow_mut().detects += 1;
        Ok(self.hits.pop_front().unwrap_or(false).then(body))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.borrow_mut().released += 1;
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }

    fn segmentation_mask(&self) -> Option<&SegmentationMask> {
        self.mask.as_ref()
    }
}

struct RecordingSurface {
    quit_after: Option<usize>,
    polls: usize,
    log: Shared,
}

impl Surface for RecordingSurface {
    fn present(&mut self, _image: &RgbImage) -> Result<()> {
        self.log.borrow_mut().presents += 1;
        Ok(())
    }

    fn poll_quit(&mut self, _timeout: Duration) -> bool {
        self.polls += 1;
        self.quit_after.is_some_and(|n| self.polls >= n)
    }

    fn close(&mut self) {
        self.log.borrow_mut().surfaces_closed += 1;
    }
}

struct ScriptedBackend {
    reads: Vec<Read>,
    hits: Vec<bool>,
    source_error: bool,
    quit_after: Option<usize>,
    still_image: Option<RgbImage>,
    headless: bool,
    estimator_error: bool,
    failing_surface: Option<SurfaceRole>,
    mask: Option<SegmentationMask>,
    fps: Option<f32>,
    log: Shared,
}

impl ScriptedBackend {
    fn new(reads: &[Read], hits: &[bool]) -> Self {
        Self {
            reads: reads.to_vec(),
            hits: hits.to_vec(),
            source_error: false,
            quit_after: None,
            still_image: None,
            headless: false,
            estimator_error: false,
            failing_surface: None,
            mask: None,
            fps: None,
            log: Shared::default(),
        }
    }

    fn frames(n: usize) -> Self {
        Self::new(&vec![Read::Frame; n], &vec![true; n])
    }
}

impl Backend for ScriptedBackend {
    fn open_source(
        &mut self,
        source: &Source,
        _capture: Option<CaptureRequest>,
    ) -> Result<Box<dyn FrameSource>> {
        if self.source_error {
            return Err(PoseError::SourceUnavailable(source.describe()));
        }
        self.log.borrow_mut().sources_opened += 1;
        if let Some(image) = self.still_image.take() {
            return Ok(Box::new(StillImageSource::from_image(image)));
        }
        Ok(Box::new(ScriptedSource {
            reads: self.reads.iter().copied().collect(),
            index: 0,
            fps: self.fps,
            log: Rc::clone(&self.log),
        }))
    }

    fn open_estimator(&mut self, config: &EstimatorConfig) -> Result<Box<dyn PoseEstimator>> {
        if self.estimator_error {
            return Err(PoseError::ModelLoadError(format!(
                "{} not found",
                config.model_path().display()
            )));
        }
        self.log.borrow_mut().estimators_opened += 1;
        Ok(Box::new(ScriptedEstimator {
            hits: self.hits.iter().copied().collect(),
            mask: self.mask.clone(),
            released: false,
            log: Rc::clone(&self.log),
        }))
    }

    fn open_surface(
        &mut self,
        role: SurfaceRole,
        _title: &str,
        _size: (u32, u32),
        _quit_keys: &[QuitKey],
    ) -> Result<Box<dyn Surface>> {
        if self.failing_surface == Some(role) {
            return Err(PoseError::FeatureNotEnabled(format!("{role:?} window")));
        }
        self.log.borrow_mut().surfaces_opened.push(role);
        if self.headless {
            return Ok(Box::new(HeadlessSurface::new()));
        }
        Ok(Box::new(RecordingSurface {
            quit_after: self.quit_after,
            polls: 0,
            log: Rc::clone(&self.log),
        }))
    }
}

fn video() -> PipelineConfig {
    PipelineConfig::video_overlay("walk.mp4")
}

#[test]
fn test_detection_then_miss_then_end_of_stream() {
    let backend = ScriptedBackend::new(&[Read::Frame, Read::Frame], &[true, false]);
    let log = Rc::clone(&backend.log);
    let mut pipeline = Pipeline::with_backend(video(), backend).unwrap();

    let report = pipeline.run().unwrap();

    assert_eq!(report.frames_consumed, 2);
    assert_eq!(report.frames_processed, 2);
    assert_eq!(report.detections, 1);
    assert_eq!(report.overlay_draws, 1);
    assert_eq!(report.stop_reason, Some(StopReason::EndOfStream));
    assert_eq!(
        report.states,
        vec![
            PipelineState::Init,
            PipelineState::Running,
            PipelineState::Draining,
            PipelineState::Stopped
        ]
    );
    assert_eq!(pipeline.state(), PipelineState::Stopped);

    let log = log.borrow();
    assert_eq!(log.reads, 3);
    assert_eq!(log.presents, 2);
    assert_eq!(log.source_closed, 1);
    assert_eq!(log.released, 1);
    assert_eq!(log.surfaces_closed, 1);
}

#[test]
fn test_unavailable_source_fails_before_anything_else_opens() {
    let mut backend = ScriptedBackend::frames(3);
    backend.source_error = true;
    let log = Rc::clone(&backend.log);
    let mut pipeline = Pipeline::with_backend(video(), backend).unwrap();

    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, PoseError::SourceUnavailable(_)));
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(
        pipeline.report().states,
        vec![
            PipelineState::Init,
            PipelineState::Failed,
            PipelineState::Draining,
            PipelineState::Stopped
        ]
    );
    assert_eq!(pipeline.report().stop_reason, Some(StopReason::Failed));

    let log = log.borrow();
    assert_eq!(log.estimators_opened, 0);
    assert!(log.surfaces_opened.is_empty());
    assert_eq!(log.detects, 0);
    assert_eq!(log.released, 0);
}

#[test]
fn test_model_load_failure_closes_the_open_source() {
    let mut backend = ScriptedBackend::frames(3);
    backend.estimator_error = true;
    let log = Rc::clone(&backend.log);
    let mut pipeline = Pipeline::with_backend(video(), backend).unwrap();

    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, PoseError::ModelLoadError(_)));
    assert_eq!(
        pipeline.report().states,
        vec![
            PipelineState::Init,
            PipelineState::Failed,
            PipelineState::Draining,
            PipelineState::Stopped
        ]
    );
    let log = log.borrow();
    assert_eq!(log.sources_opened, 1);
    assert_eq!(log.source_closed, 1);
    assert_eq!(log.estimators_opened, 0);
    assert_eq!(log.released, 0);
    assert!(log.surfaces_opened.is_empty());
    assert_eq!(log.reads, 0);
}

#[test]
fn test_scene_window_failure_releases_what_was_opened() {
    let mut backend = ScriptedBackend::frames(3);
    backend.failing_surface = Some(SurfaceRole::Scene);
    let log = Rc::clone(&backend.log);
    let config = PipelineConfig::video_scene_and_overlay("walk.mp4");
    let mut pipeline = Pipeline::with_backend(config, backend).unwrap();

    let err = pipeline.run().unwrap_err();
    drop(pipeline);

    assert!(matches!(err, PoseError::FeatureNotEnabled(_)));
    let log = log.borrow();
    assert_eq!(log.surfaces_opened, vec![SurfaceRole::Overlay]);
    assert_eq!(log.source_closed, 1);
    assert_eq!(log.released, 1);
    assert_eq!(log.surfaces_closed, 1);
    assert_eq!(log.detects, 0);
}

#[test]
fn test_read_failure_mid_stream_releases_everything_once() {
    let backend = ScriptedBackend::new(&[Read::Frame, Read::Frame, Read::Fail], &[true, true]);
    let log = Rc::clone(&backend.log);
    let mut pipeline = Pipeline::with_backend(video(), backend).unwrap();

    let err = pipeline.run().unwrap_err();
    drop(pipeline);

    assert!(matches!(err, PoseError::ReadFailure(_)));
    let log = log.borrow();
    assert_eq!(log.detects, 2);
    assert_eq!(log.source_closed, 1);
    assert_eq!(log.released, 1);
    assert_eq!(log.surfaces_closed, 1);
}

#[test]
fn test_failed_run_records_failed_before_draining() {
    let backend = ScriptedBackend::new(&[Read::Fail], &[]);
    let mut pipeline = Pipeline::with_backend(video(), backend).unwrap();

    assert!(pipeline.run().is_err());

    let states = &pipeline.report().states;
    let failed = states.iter().position(|s| *s == PipelineState::Failed);
    let draining = states.iter().position(|s| *s == PipelineState::Draining);
    assert!(failed.is_some() && failed < draining);
    assert_eq!(states.last(), Some(&PipelineState::Stopped));
}

#[test]
fn test_frame_skip_consumes_every_frame() {
    let backend = ScriptedBackend::frames(7);
    let log = Rc::clone(&backend.log);
    let config = video().with_frame_skip(3);
    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.frames_consumed, 7);
    assert_eq!(report.frames_processed, 2);
    assert_eq!(log.borrow().detects, 2);
}

#[test]
fn test_quit_key_stops_the_run() {
    let mut backend = ScriptedBackend::frames(10);
    backend.quit_after = Some(3);
    let log = Rc::clone(&backend.log);
    let report = Pipeline::with_backend(video(), backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.stop_reason, Some(StopReason::Quit));
    assert_eq!(report.frames_processed, 3);
    let log = log.borrow();
    assert_eq!(log.source_closed, 1);
    assert_eq!(log.released, 1);
}

#[test]
fn test_scene_mode_opens_preview_and_scene() {
    let backend = ScriptedBackend::frames(4);
    let log = Rc::clone(&backend.log);
    let config = PipelineConfig::video_scene("walk.mp4");
    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.frames_processed, 2);
    assert_eq!(report.scene_redraws, 2);
    assert_eq!(report.overlay_draws, 0);
    let log = log.borrow();
    assert_eq!(
        log.surfaces_opened,
        vec![SurfaceRole::Overlay, SurfaceRole::Scene]
    );
    assert_eq!(log.surfaces_closed, 2);
}

#[test]
fn test_scene_without_preview_opens_only_the_scene() {
    let backend = ScriptedBackend::frames(2);
    let log = Rc::clone(&backend.log);
    let config = PipelineConfig::video_scene("walk.mp4")
        .with_frame_skip(1)
        .with_preview(false);
    Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(log.borrow().surfaces_opened, vec![SurfaceRole::Scene]);
}

#[test]
fn test_still_image_writes_annotated_copy() {
    let dir = std::env::temp_dir().join(format!("pose-visualizer-test-{}", std::process::id()));
    let mut backend = ScriptedBackend::new(&[], &[true]);
    backend.still_image = Some(RgbImage::from_pixel(120, 160, Rgb([200, 200, 200])));
    backend.headless = true;
    let config = PipelineConfig::still_image("football.jpeg").with_output_dir(&dir);

    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    let expected: PathBuf = dir.join("football_output_pose.jpg");
    assert_eq!(report.output.as_deref(), Some(expected.as_path()));
    assert!(expected.exists());
    assert_eq!(report.overlay_draws, 1);
    assert_eq!(report.stop_reason, Some(StopReason::EndOfStream));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_still_image_save_failure_reports_no_output() {
    let dir = std::env::temp_dir().join(format!("pose-visualizer-blocked-{}", std::process::id()));
    // A directory squatting on the output name makes the write fail.
    let blocked = dir.join("football_output_pose.jpg");
    std::fs::create_dir_all(&blocked).unwrap();
    let mut backend = ScriptedBackend::new(&[], &[true]);
    backend.still_image = Some(RgbImage::from_pixel(120, 160, Rgb([200, 200, 200])));
    backend.headless = true;
    let config = PipelineConfig::still_image("football.jpeg").with_output_dir(&dir);

    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert!(report.output.is_none());
    assert_eq!(report.detections, 1);
    assert!(blocked.is_dir());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_still_image_without_body_writes_nothing() {
    let dir = std::env::temp_dir().join(format!("pose-visualizer-miss-{}", std::process::id()));
    let mut backend = ScriptedBackend::new(&[], &[false]);
    backend.still_image = Some(RgbImage::new(40, 40));
    backend.headless = true;
    let config = PipelineConfig::still_image("empty.png").with_output_dir(&dir);

    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert!(report.output.is_none());
    assert_eq!(report.detections, 0);
    assert!(!dir.join("empty_output_pose.jpg").exists());
}

#[test]
fn test_second_run_is_rejected() {
    let mut pipeline = Pipeline::with_backend(video(), ScriptedBackend::frames(1)).unwrap();
    pipeline.run().unwrap();
    assert!(matches!(pipeline.run(), Err(PoseError::ConfigError(_))));
}

#[test]
fn test_both_mode_draws_overlay_and_scene() {
    let backend = ScriptedBackend::new(&[Read::Frame; 3], &[true, false, true]);
    let config = PipelineConfig::video_scene_and_overlay("walk.mp4");
    assert_eq!(config.mode, RenderMode::Both);
    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.overlay_draws, 2);
    assert_eq!(report.scene_redraws, 2);
}

#[test]
fn test_segmentation_mask_is_tinted_on_the_overlay() {
    let mut backend = ScriptedBackend::new(&[Read::Frame; 2], &[true, true]);
    backend.mask = Some(SegmentationMask {
        mask: GrayImage::from_pixel(32, 32, Luma([255])),
        roi: Roi::full_frame(64, 48),
    });
    let config = video().with_estimator(EstimatorConfig::new().with_segmentation(true));
    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.mask_draws, 2);
    assert_eq!(report.overlay_draws, 2);
}

#[test]
fn test_scene_mode_ignores_the_mask() {
    let mut backend = ScriptedBackend::frames(2);
    backend.mask = Some(SegmentationMask {
        mask: GrayImage::from_pixel(32, 32, Luma([255])),
        roi: Roi::full_frame(64, 48),
    });
    let config = PipelineConfig::video_scene("walk.mp4").with_frame_skip(1);
    let report = Pipeline::with_backend(config, backend)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.mask_draws, 0);
    assert_eq!(report.scene_redraws, 2);
}

#[test]
fn test_source_frame_rate_is_reported() {
    let mut backend = ScriptedBackend::frames(1);
    backend.fps = Some(30.0);
    let report = Pipeline::with_backend(video(), backend)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.source_fps, Some(30.0));

    let report = Pipeline::with_backend(video(), ScriptedBackend::frames(1))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.source_fps, None);
}
