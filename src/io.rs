// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! I/O utilities: FFmpeg initialization and the annotated still-image artifact.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{PoseError, Result};

#[cfg(feature = "video")]
use std::sync::Once;

#[cfg(feature = "video")]
static INIT: Once = Once::new();

/// Suffix appended to the input's base name for the annotated copy.
pub const OUTPUT_SUFFIX: &str = "_output_pose.jpg";

/// Initialize `video-rs` once and silence `FFmpeg` logs.
///
/// Safe to call multiple times.
#[allow(clippy::missing_const_for_fn)]
pub fn init_video() {
    #[cfg(feature = "video")]
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            crate::error!("Failed to initialize video-rs: {e}");
        }

        ffmpeg_next::log::set_level(ffmpeg_next::log::Level::Error);
    });
}

/// Output path of the annotated copy of `input`: `<dir>/<base>_output_pose.jpg`.
#[must_use]
pub fn annotated_output_path(input: &Path, dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    dir.join(format!("{stem}{OUTPUT_SUFFIX}"))
}

/// Write an annotated image as JPEG, creating the directory if needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the image cannot be encoded.
pub fn save_annotated(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            PoseError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory {}: {e}", parent.display()),
            ))
        })?;
    }

    image
        .save_with_format(path, image::ImageFormat::Jpeg)
        .map_err(|e| PoseError::ImageError(format!("Failed to save {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_output_path() {
        let out = annotated_output_path(
            Path::new("Pose-Visualizer-MediaPipe/football.jpeg"),
            Path::new("."),
        );
        assert_eq!(out, Path::new(".").join("football_output_pose.jpg"));

        let out = annotated_output_path(Path::new("babar.png"), Path::new("runs"));
        assert_eq!(out, Path::new("runs").join("babar_output_pose.jpg"));
    }

    #[test]
    fn test_save_annotated_writes_jpeg() {
        let dir = std::env::temp_dir().join(format!("pose-visualizer-io-{}", std::process::id()));
        let path = annotated_output_path(Path::new("still.png"), &dir);

        save_annotated(&RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 30])), &path).unwrap();
        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (8, 8));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(feature = "video")]
    #[test]
    fn test_init_video_keeps_only_ffmpeg_errors() {
        init_video();
        init_video();
        assert!(matches!(
            ffmpeg_next::log::get_level(),
            Ok(ffmpeg_next::log::Level::Error)
        ));
    }
}
