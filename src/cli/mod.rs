// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! This module contains argument parsing and the `stream` and `image` command
//! implementations.

/// CLI arguments.
pub mod args;

/// Command implementations.
pub mod run;
