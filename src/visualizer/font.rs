// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Font lookup for on-screen text.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::FontArc;

use crate::{verbose, warn};

/// Assets URL for downloading fonts
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Font used for the FPS readout and the scene labels.
pub const DEFAULT_FONT: &str = "Arial.ttf";

static FONT: OnceLock<Option<FontArc>> = OnceLock::new();

/// Per-user font cache: `<config dir>/pose-visualizer/`.
#[must_use]
pub fn font_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(crate::NAME))
}

/// Check if font exists locally or download it into [`font_dir`].
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy();
    let config_dir = font_dir()?;
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        warn!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    verbose!("Downloading {url} to {}", font_path.display());

    let response = match ureq::get(&url).call() {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to download font from {url}: {e}");
            return None;
        }
    };

    let mut file = match File::create(&font_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create font file: {e}");
            return None;
        }
    };

    let mut reader = response.into_body().into_reader();
    if let Err(e) = io::copy(&mut reader, &mut file) {
        warn!("Failed to download font: {e}");
        let _ = fs::remove_file(&font_path);
        return None;
    }

    Some(font_path)
}

/// Load a font file into memory.
#[must_use]
pub fn load_font(path: &Path) -> Option<FontArc> {
    let data = fs::read(path).ok()?;
    FontArc::try_from_vec(data).ok()
}

/// The process-wide default font, resolved on first use.
///
/// Returns `None` when the font is neither cached nor downloadable; callers
/// then skip text.
pub fn default_font() -> Option<FontArc> {
    FONT.get_or_init(|| {
        let font = check_font(DEFAULT_FONT).and_then(|path| load_font(&path));
        if font.is_none() {
            warn!("Font {DEFAULT_FONT} unavailable, on-screen text disabled");
        }
        font
    })
    .clone()
}
