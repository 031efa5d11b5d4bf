// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Native window for displaying frames.

use std::time::{Duration, Instant};

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};

use crate::config::QuitKey;
use crate::error::{PoseError, Result};
use crate::visualizer::surface::Surface;

/// A simple image viewer using minifb.
pub struct Viewer {
    window: Option<Window>,
    title: String,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
    quit_keys: Vec<Key>,
    /// Input was processed by the last `present` and not yet polled.
    fresh: bool,
}

impl Viewer {
    /// Create a new viewer window.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::VisualizerError`] if the window cannot be created.
    pub fn new(title: &str, width: usize, height: usize, quit_keys: &[QuitKey]) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| PoseError::VisualizerError(format!("Failed to create window: {e}")))?;

        // Limit update rate
        window.set_target_fps(60);

        Ok(Self {
            window: Some(window),
            title: title.to_string(),
            width,
            height,
            buffer: Vec::new(),
            quit_keys: quit_keys.iter().filter_map(|k| key_for(*k)).collect(),
            fresh: false,
        })
    }

    /// Window title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    fn quit_requested(&self) -> bool {
        self.window.as_ref().is_none_or(|w| {
            !w.is_open() || self.quit_keys.iter().any(|k| w.is_key_down(*k))
        })
    }
}

impl Surface for Viewer {
    fn present(&mut self, image: &RgbImage) -> Result<()> {
        let Some(window) = self.window.as_mut() else {
            return Err(PoseError::VisualizerError(format!("{} is closed", self.title)));
        };

        let (img_width, img_height) = (image.width() as usize, image.height() as usize);
        let num_pixels = img_width * img_height;
        if self.buffer.len() != num_pixels {
            self.buffer.resize(num_pixels, 0);
        }

        // Pack as 0x00RRGGBB
        for (dst, p) in self.buffer.iter_mut().zip(image.pixels()) {
            *dst = (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2]);
        }
        self.width = img_width;
        self.height = img_height;

        window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| PoseError::VisualizerError(format!("Failed to update window: {e}")))?;
        self.fresh = true;
        Ok(())
    }

    fn poll_quit(&mut self, timeout: Duration) -> bool {
        if std::mem::take(&mut self.fresh) && self.quit_requested() {
            return true;
        }

        let start = Instant::now();
        loop {
            let Some(window) = self.window.as_mut() else {
                return true;
            };
            if self.buffer.is_empty() {
                window.update();
            } else {
                let _ = window.update_with_buffer(&self.buffer, self.width, self.height);
            }
            if self.quit_requested() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
        }
    }

    fn close(&mut self) {
        self.window = None;
    }
}

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];
const DIGITS: [Key; 10] = [
    Key::Key0, Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
    Key::Key6, Key::Key7, Key::Key8, Key::Key9,
];

/// Keyboard key for a quit binding. Characters outside `a-z` and `0-9` have no key.
#[must_use]
pub fn key_for(key: QuitKey) -> Option<Key> {
    let c = match key {
        QuitKey::Escape => return Some(Key::Escape),
        QuitKey::Char(c) => c.to_ascii_lowercase(),
    };
    match c {
        'a'..='z' => Some(LETTERS[c as usize - 'a' as usize]),
        '0'..='9' => Some(DIGITS[c as usize - '0' as usize]),
        ' ' => Some(Key::Space),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_key_mapping() {
        assert_eq!(key_for(QuitKey::Escape), Some(Key::Escape));
        assert_eq!(key_for(QuitKey::Char('q')), Some(Key::Q));
        assert_eq!(key_for(QuitKey::Char('Q')), Some(Key::Q));
        assert_eq!(key_for(QuitKey::Char('7')), Some(Key::Key7));
        assert_eq!(key_for(QuitKey::Char('é')), None);
    }
}
