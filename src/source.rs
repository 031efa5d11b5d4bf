// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame sources.
//!
//! This module wraps capture devices, video files and still images behind the
//! [`FrameSource`] trait: `next_frame` yields a [`Frame`], `Ok(None)` at end of
//! stream, and [`PoseError::ReadFailure`] when a read fails after opening.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{PoseError, Result};

/// Represents the input sources the pipeline can read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Capture device index.
    Webcam(u32),
    /// Path to a video file.
    Video(PathBuf),
    /// Path to a single still image.
    Image(PathBuf),
}

impl Source {
    /// Check if this source is a single image.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Check if this source is a video or camera stream.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_) | Self::Webcam(_))
    }

    /// Get the path if this source has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Image(p) | Self::Video(p) => Some(p),
            Self::Webcam(_) => None,
        }
    }

    /// Human readable description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Webcam(idx) => format!("camera {idx}"),
            Self::Video(p) => format!("video {}", p.display()),
            Self::Image(p) => format!("image {}", p.display()),
        }
    }

    /// Check if a path is an image file based on extension.
    fn is_image_file(path: &Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            matches!(
                ext.as_str(),
                "jpg" | "jpeg" | "png" | "bmp" | "gif" | "webp" | "tiff" | "tif"
            )
        })
    }
}

/// Convert from a string to a Source: a device index, an image path, or a video path.
impl From<&str> for Source {
    fn from(s: &str) -> Self {
        if let Ok(idx) = s.parse::<u32>() {
            return Self::Webcam(idx);
        }

        let path = PathBuf::from(s);
        if Self::is_image_file(&path) {
            Self::Image(path)
        } else {
            Self::Video(path)
        }
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<u32> for Source {
    fn from(idx: u32) -> Self {
        Self::Webcam(idx)
    }
}

/// Capture resolution and rate requested from a camera.
///
/// Devices that do not support the request fall back to their native mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

impl CaptureRequest {
    /// 1280x720 at 30 frames per second.
    pub const DEFAULT: Self = Self::new(1280, 720, 30);

    /// Create a new capture request.
    #[must_use]
    pub const fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }
}

/// Parse `WIDTHxHEIGHT@FPS`, for example `1280x720@30`.
impl std::str::FromStr for CaptureRequest {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || format!("Invalid capture request '{s}', expected WIDTHxHEIGHT@FPS");
        let (size, fps) = s.split_once('@').ok_or_else(invalid)?;
        let (width, height) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
        let parse = |v: &str| v.trim().parse::<u32>().ok().filter(|&n| n > 0);
        match (parse(width), parse(height), parse(fps)) {
            (Some(w), Some(h), Some(f)) => Ok(Self::new(w, h, f)),
            _ => Err(invalid()),
        }
    }
}

/// One decoded frame, owned by the pipeline for a single iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixels.
    pub image: RgbImage,
    /// Zero-based position in the stream.
    pub index: usize,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub const fn new(image: RgbImage, index: usize) -> Self {
        Self { image, index }
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A producer of frames with an end-of-stream signal.
pub trait FrameSource {
    /// Read the next frame.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ReadFailure`] if the read fails unexpectedly.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying device or file handle.
    fn close(&mut self);

    /// Intrinsic frame rate, when known.
    fn fps(&self) -> Option<f32> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn fps(&self) -> Option<f32> {
        (**self).fps()
    }
}

/// Open a source.
///
/// # Errors
///
/// Returns [`PoseError::SourceUnavailable`] if the device, video or image cannot be opened.
pub fn open_source(
    source: &Source,
    capture: Option<CaptureRequest>,
) -> Result<Box<dyn FrameSource>> {
    match source {
        Source::Image(path) => Ok(Box::new(StillImageSource::open(path)?)),
        #[cfg(feature = "video")]
        Source::Video(path) => Ok(Box::new(VideoFrameSource::open_file(path)?)),
        #[cfg(feature = "video")]
        Source::Webcam(idx) => Ok(Box::new(VideoFrameSource::open_camera(*idx, capture)?)),
        #[cfg(not(feature = "video"))]
        Source::Video(_) | Source::Webcam(_) => {
            let _ = capture;
            Err(PoseError::SourceUnavailable(format!(
                "{}: video support requires the 'video' feature",
                source.describe()
            )))
        }
    }
}

/// A single still image, yielded once.
#[derive(Debug)]
pub struct StillImageSource {
    image: Option<RgbImage>,
}

impl StillImageSource {
    /// Load an image from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::SourceUnavailable`] if the file cannot be read or decoded.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path).map_err(|e| {
            PoseError::SourceUnavailable(format!("Could not read image {}: {e}", path.display()))
        })?;
        Ok(Self::from_image(image.to_rgb8()))
    }

    /// Wrap an in-memory image.
    #[must_use]
    pub const fn from_image(image: RgbImage) -> Self {
        Self { image: Some(image) }
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.image.take().map(|image| Frame::new(image, 0)))
    }

    fn close(&mut self) {
        self.image = None;
    }
}

/// Frames decoded from a video file or capture device through FFmpeg.
#[cfg(feature = "video")]
pub struct VideoFrameSource {
    decoder: Option<video_rs::decode::Decoder>,
    location: String,
    current_frame: usize,
}

#[cfg(feature = "video")]
impl VideoFrameSource {
    /// Open a video file.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::SourceUnavailable`] if the file cannot be opened.
    pub fn open_file(path: &Path) -> Result<Self> {
        crate::io::init_video();

        let decoder = video_rs::decode::Decoder::new(path).map_err(|e| {
            PoseError::SourceUnavailable(format!("Could not open video {}: {e}", path.display()))
        })?;

        Ok(Self {
            decoder: Some(decoder),
            location: path.display().to_string(),
            current_frame: 0,
        })
    }

    /// Open a capture device by index.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::SourceUnavailable`] if the device cannot be opened.
    pub fn open_camera(index: u32, capture: Option<CaptureRequest>) -> Result<Self> {
        crate::io::init_video();

        let device = camera_device_path(index);
        let mut options = std::collections::HashMap::new();
        if let Some(req) = capture {
            options.insert(
                "video_size".to_string(),
                format!("{}x{}", req.width, req.height),
            );
            options.insert("framerate".to_string(), req.fps.to_string());
        }
        let options: video_rs::Options = options.into();

        let decoder = video_rs::decode::DecoderBuilder::new(device.as_path())
            .with_options(&options)
            .build()
            .map_err(|e| {
                PoseError::SourceUnavailable(format!("Could not open camera {index}: {e}"))
            })?;

        Ok(Self {
            decoder: Some(decoder),
            location: device.display().to_string(),
            current_frame: 0,
        })
    }
}

#[cfg(feature = "video")]
impl FrameSource for VideoFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        match decoder.decode() {
            Ok((_ts, frame)) => {
                let image = video_frame_to_image(&frame)?;
                let frame = Frame::new(image, self.current_frame);
                self.current_frame += 1;
                Ok(Some(frame))
            }
            Err(video_rs::Error::DecodeExhausted | video_rs::Error::ReadExhausted) => Ok(None),
            Err(e) => Err(PoseError::ReadFailure(format!(
                "{} (frame {}): {e}",
                self.location, self.current_frame
            ))),
        }
    }

    fn close(&mut self) {
        self.decoder = None;
    }

    fn fps(&self) -> Option<f32> {
        self.decoder.as_ref().map(video_rs::decode::Decoder::frame_rate)
    }
}

/// Device node of a capture device.
#[cfg(feature = "video")]
fn camera_device_path(index: u32) -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from(format!("/dev/video{index}"))
    } else {
        PathBuf::from(index.to_string())
    }
}

#[cfg(feature = "video")]
/// Convert a `video_rs` frame (HWC RGB) to an `RgbImage`.
fn video_frame_to_image(arr: &video_rs::Frame) -> Result<RgbImage> {
    let shape = arr.shape();
    let height = u32::try_from(shape[0])
        .map_err(|_| PoseError::ReadFailure("Frame height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(shape[1])
        .map_err(|_| PoseError::ReadFailure("Frame width exceeds u32::MAX".to_string()))?;

    let raw = arr.as_standard_layout().iter().copied().collect::<Vec<u8>>();

    RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| PoseError::ReadFailure("Failed to create image from video frame".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capture_request() {
        assert_eq!(
            "640x480@15".parse::<CaptureRequest>().unwrap(),
            CaptureRequest::new(640, 480, 15)
        );
        assert_eq!("1280X720@30".parse::<CaptureRequest>().unwrap(), CaptureRequest::DEFAULT);
        assert!("1280x720".parse::<CaptureRequest>().is_err());
        assert!("0x720@30".parse::<CaptureRequest>().is_err());
        assert!("wide@30".parse::<CaptureRequest>().is_err());
    }

    #[test]
    fn test_source_from_string() {
        assert!(matches!(Source::from("football.jpeg"), Source::Image(_)));
        assert!(matches!(Source::from("photo.PNG"), Source::Image(_)));
        assert!(matches!(Source::from("video.mp4"), Source::Video(_)));
        assert!(matches!(Source::from("0"), Source::Webcam(0)));
        assert!(matches!(Source::from(2u32), Source::Webcam(2)));
    }

    #[test]
    fn test_source_checks() {
        let img = Source::Image(PathBuf::from("test.jpg"));
        assert!(img.is_image());
        assert!(!img.is_video());
        assert_eq!(img.path(), Some(Path::new("test.jpg")));

        let cam = Source::Webcam(0);
        assert!(cam.is_video());
        assert!(cam.path().is_none());
        assert_eq!(cam.describe(), "camera 0");
    }

    #[test]
    fn test_still_image_yields_once() {
        let mut source = StillImageSource::from_image(RgbImage::new(4, 3));
        let frame = source.next_frame().unwrap().expect("one frame");
        assert_eq!((frame.width(), frame.height(), frame.index), (4, 3, 0));
        assert!(source.next_frame().unwrap().is_none());
        source.close();
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_image_is_unavailable() {
        let result = open_source(&Source::Image(PathBuf::from("does/not/exist.jpg")), None);
        assert!(matches!(result, Err(PoseError::SourceUnavailable(_))));
    }

    #[cfg(not(feature = "video"))]
    #[test]
    fn test_video_without_feature_is_unavailable() {
        let result = open_source(&Source::Video(PathBuf::from("video.mp4")), None);
        assert!(matches!(result, Err(PoseError::SourceUnavailable(_))));
    }
}
