// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Fidelity, PresenceOutput, RenderMode};
use crate::source::CaptureRequest;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r"Examples:
    pose-visualizer stream --source 0 --fps
    pose-visualizer stream --source video.mp4
    pose-visualizer stream --source video.mp4 --mode 3d
    pose-visualizer stream --source video.mp4 --mode both --skip 2
    pose-visualizer image --source football.jpeg
    pose-visualizer image --source football.jpeg --headless --output-dir runs")]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track a pose in a camera feed or video file
    Stream(StreamArgs),
    /// Annotate the pose in a single image
    Image(ImageArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CommonArgs {
    /// Path to an ONNX pose landmark model (overrides --fidelity)
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Directory holding pose_landmark_{lite,full,heavy}.onnx
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    /// Model fidelity (low, balanced, high)
    #[arg(long, default_value = "balanced")]
    pub fidelity: Fidelity,

    /// Minimum presence score to accept a detection
    #[arg(long, default_value_t = 0.5)]
    pub conf: f32,

    /// Tint the segmented body on the 2D window
    #[arg(long, default_value_t = false)]
    pub segmentation: bool,

    /// Scale of the model's presence output (probability, logit)
    #[arg(long, default_value = "probability")]
    pub presence: PresenceOutput,

    /// Landmark marker radius on the 2D window
    #[arg(long)]
    pub radius: Option<i32>,

    /// Bone thickness on the 2D window
    #[arg(long)]
    pub thickness: Option<u32>,

    /// Hide landmarks less visible than this
    #[arg(long)]
    pub min_visibility: Option<f32>,

    /// ONNX Runtime intra-op threads (0 = automatic)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Window width
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height
    #[arg(long)]
    pub height: Option<u32>,

    /// Run without windows
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the stream command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct StreamArgs {
    /// Camera index or video file
    #[arg(short, long, default_value = "0")]
    pub source: String,

    /// Renderers to run (2d, 3d, both)
    #[arg(long, default_value = "2d")]
    pub mode: RenderMode,

    /// Process every Nth frame (preset default when omitted)
    #[arg(long)]
    pub skip: Option<usize>,

    /// Minimum presence score to keep following a tracked body
    #[arg(long, default_value_t = 0.5)]
    pub track_conf: f32,

    /// Treat every frame as an unrelated image
    #[arg(long = "static", default_value_t = false)]
    pub static_mode: bool,

    /// Draw the frame rate on the 2D window
    #[arg(long, default_value_t = false)]
    pub fps: bool,

    /// Hide the raw video preview in 3D mode
    #[arg(long, default_value_t = false)]
    pub no_preview: bool,

    /// Camera capture mode as WIDTHxHEIGHT@FPS
    #[arg(long)]
    pub capture: Option<CaptureRequest>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the image command.
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Image file
    #[arg(short, long)]
    pub source: PathBuf,

    /// Directory for <name>_output_pose.jpg
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_stream_args_defaults() {
        let args = Cli::parse_from(["app", "stream"]);
        match args.command {
            Commands::Stream(stream) => {
                assert_eq!(stream.source, "0");
                assert_eq!(stream.mode, RenderMode::Overlay);
                assert!(stream.skip.is_none());
                assert!(!stream.static_mode);
                assert_eq!(stream.common.fidelity, Fidelity::Balanced);
                assert!((stream.common.conf - 0.5).abs() < f32::EPSILON);
                assert!(stream.common.verbose);
                assert_eq!(stream.common.presence, PresenceOutput::Probability);
                assert!(stream.capture.is_none());
                assert!(stream.common.radius.is_none());
            }
            Commands::Image(_) => panic!("expected stream"),
        }
    }

    #[test]
    fn test_stream_args_custom() {
        let args = Cli::parse_from([
            "app",
            "stream",
            "--source",
            "video.mp4",
            "--mode",
            "3d",
            "--skip",
            "3",
            "--fidelity",
            "high",
            "--static",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Stream(stream) => {
                assert_eq!(stream.source, "video.mp4");
                assert_eq!(stream.mode, RenderMode::Scene);
                assert_eq!(stream.skip, Some(3));
                assert!(stream.static_mode);
                assert_eq!(stream.common.fidelity, Fidelity::High);
                assert!(!stream.common.verbose);
            }
            Commands::Image(_) => panic!("expected stream"),
        }
    }

    #[test]
    fn test_image_args() {
        let args = Cli::parse_from(["app", "image", "-s", "football.jpeg", "--headless"]);
        match args.command {
            Commands::Image(image) => {
                assert_eq!(image.source, PathBuf::from("football.jpeg"));
                assert_eq!(image.output_dir, PathBuf::from("."));
                assert!(image.common.headless);
            }
            Commands::Stream(_) => panic!("expected image"),
        }
    }
}
