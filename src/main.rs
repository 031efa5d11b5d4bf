// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;
use pose_visualizer::cli::args::{Cli, Commands};
use pose_visualizer::cli::run::{run_image, run_stream};
use pose_visualizer::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Stream(args) => run_stream(args),
        Commands::Image(args) => run_image(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
