// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Rendering and display: the 2D overlay, the 3D scene and the windows they are shown in.

/// Color definitions and palettes.
pub mod color;
pub mod font;
pub mod overlay;
pub mod scene;
pub mod surface;

#[cfg(feature = "visualize")]
pub mod viewer;

pub use color::Color;
pub use overlay::{FpsMeter, LandmarkPalette, OverlayRenderer, OverlayStyle};
pub use scene::{SceneRenderer, SceneState, SceneView};
pub use surface::{HeadlessSurface, Surface};

#[cfg(feature = "visualize")]
pub use viewer::Viewer;
