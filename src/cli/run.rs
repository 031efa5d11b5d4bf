// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command implementations.

use crate::cli::args::{CommonArgs, ImageArgs, StreamArgs};
use crate::config::{EstimatorConfig, PipelineConfig, RenderMode, TrackingMode};
use crate::error::Result;
use crate::logging::set_verbose;
use crate::pipeline::{NativeBackend, Pipeline, RunReport};
use crate::source::{CaptureRequest, Source};
use crate::{VERSION, verbose, warn};

/// Estimator settings shared by both commands.
fn estimator_config(common: &CommonArgs, tracking_mode: TrackingMode) -> EstimatorConfig {
    let mut config = EstimatorConfig::new()
        .with_model_dir(&common.model_dir)
        .with_fidelity(common.fidelity)
        .with_tracking_mode(tracking_mode)
        .with_detection_confidence(common.conf)
        .with_segmentation(common.segmentation)
        .with_presence_output(common.presence)
        .with_threads(common.threads);
    if let Some(model) = &common.model {
        config = config.with_model(model);
    }
    config
}

/// Apply the window size and overlay style overrides.
fn with_display(mut config: PipelineConfig, common: &CommonArgs) -> PipelineConfig {
    let (w, h) = config.overlay_size;
    config.overlay_size = (common.width.unwrap_or(w), common.height.unwrap_or(h));

    let mut style = config.overlay_style;
    if let Some(radius) = common.radius {
        style = style.with_radius(radius);
    }
    if let Some(thickness) = common.thickness {
        style = style.with_thickness(thickness);
    }
    if let Some(min_visibility) = common.min_visibility {
        style = style.with_min_visibility(min_visibility);
    }
    config.overlay_style = style;
    config
}

/// Build the pipeline configuration of the `stream` command.
///
/// Starts from the preset matching the source and mode, then applies the flags.
#[must_use]
pub fn stream_config(args: &StreamArgs) -> PipelineConfig {
    let source = Source::from(args.source.as_str());
    let preset = match (&source, args.mode) {
        (Source::Webcam(idx), RenderMode::Overlay) => PipelineConfig::webcam_overlay(*idx),
        (_, RenderMode::Scene) => PipelineConfig::video_scene(args.source.as_str()),
        (_, RenderMode::Both) => PipelineConfig::video_scene_and_overlay(args.source.as_str()),
        (_, mode) => PipelineConfig::video_overlay(args.source.as_str()).with_mode(mode),
    };

    let tracking = if args.static_mode {
        TrackingMode::Static
    } else {
        TrackingMode::Continuous
    };
    let estimator = estimator_config(&args.common, tracking)
        .with_tracking_confidence(args.track_conf);

    // Every camera gets a capture request, whichever preset it started from.
    let capture = match source {
        Source::Webcam(_) => args.capture.or(preset.capture).or(Some(CaptureRequest::DEFAULT)),
        Source::Video(_) | Source::Image(_) => None,
    };

    let mut config = preset
        .with_source(source)
        .with_capture(capture)
        .with_estimator(estimator)
        .with_preview(!args.no_preview);
    if args.fps {
        config = config.with_fps(true);
    }
    if let Some(skip) = args.skip {
        config = config.with_frame_skip(skip);
    }
    with_display(config, &args.common)
}

/// Build the pipeline configuration of the `image` command.
#[must_use]
pub fn image_config(args: &ImageArgs) -> PipelineConfig {
    let config = PipelineConfig::still_image(&args.source)
        .with_estimator(estimator_config(&args.common, TrackingMode::Static))
        .with_output_dir(&args.output_dir);
    with_display(config, &args.common)
}

fn run_pipeline(config: PipelineConfig, common: &CommonArgs) -> Result<RunReport> {
    set_verbose(common.verbose);
    verbose!("pose-visualizer {VERSION}");

    let backend = if common.headless {
        NativeBackend::headless()
    } else {
        NativeBackend::new()
    };
    Pipeline::with_backend(config, backend)?.run()
}

/// Run the `stream` command.
///
/// # Errors
///
/// Returns the error that ended the run.
pub fn run_stream(args: &StreamArgs) -> Result<RunReport> {
    if args.mode == RenderMode::StillImage {
        warn!("Use the 'image' command for still images");
    }
    run_pipeline(stream_config(args), &args.common)
}

/// Run the `image` command.
///
/// # Errors
///
/// Returns the error that ended the run.
pub fn run_image(args: &ImageArgs) -> Result<RunReport> {
    let report = run_pipeline(image_config(args), &args.common)?;
    if report.output.is_none() {
        warn!("No body detected in {}", args.source.display());
    }
    Ok(report)
}
