// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Display surfaces.

use std::time::Duration;

use image::RgbImage;

use crate::error::Result;

/// Interval between input polls while waiting for a quit key.
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Somewhere frames can be shown and quit keys read.
pub trait Surface {
    /// Show `image`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PoseError::VisualizerError`] if the surface cannot be updated.
    fn present(&mut self, image: &RgbImage) -> Result<()>;

    /// Process input for up to `timeout` and report whether a quit key was
    /// pressed or the surface was closed by the user.
    fn poll_quit(&mut self, timeout: Duration) -> bool;

    /// Release the surface. Calling it again has no effect.
    fn close(&mut self);

    /// Block until a quit key is pressed or the surface is closed.
    fn wait_until_quit(&mut self) {
        while !self.poll_quit(WAIT_POLL_INTERVAL) {}
    }
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn present(&mut self, image: &RgbImage) -> Result<()> {
        (**self).present(image)
    }

    fn poll_quit(&mut self, timeout: Duration) -> bool {
        (**self).poll_quit(timeout)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn wait_until_quit(&mut self) {
        (**self).wait_until_quit();
    }
}

/// A surface without a window.
///
/// Keeps the last presented image and never requests a quit, so runs end at
/// end of stream. Waiting returns immediately.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    last: Option<RgbImage>,
    presented: usize,
    closed: bool,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last presented image.
    #[must_use]
    pub const fn last(&self) -> Option<&RgbImage> {
        self.last.as_ref()
    }

    /// Number of presented images.
    #[must_use]
    pub const fn presented(&self) -> usize {
        self.presented
    }

    /// Whether [`Surface::close`] was called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Surface for HeadlessSurface {
    fn present(&mut self, image: &RgbImage) -> Result<()> {
        self.last = Some(image.clone());
        self.presented += 1;
        Ok(())
    }

    fn poll_quit(&mut self, _timeout: Duration) -> bool {
        false
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn wait_until_quit(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_surface_records_frames() {
        let mut surface: Box<dyn Surface> = Box::new(HeadlessSurface::new());
        surface.present(&RgbImage::new(2, 2)).unwrap();
        assert!(!surface.poll_quit(Duration::from_millis(1)));
        surface.wait_until_quit();
        surface.close();

        let mut headless = HeadlessSurface::new();
        headless.present(&RgbImage::new(3, 1)).unwrap();
        headless.present(&RgbImage::new(5, 4)).unwrap();
        assert_eq!(headless.presented(), 2);
        assert_eq!(headless.last().map(RgbImage::dimensions), Some((5, 4)));
        assert!(!headless.is_closed());
        headless.close();
        assert!(headless.is_closed());
    }
}
