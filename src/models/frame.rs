use std::sync::Arc;

use image::RgbImage;

/// One captured video frame. Pixels are shared, so clones are cheap and a
/// clip handed to the delivery worker never aliases the live buffer's storage.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pixels: Arc<RgbImage>,
    /// Monotonic capture time in seconds.
    pub captured_at: f64,
}

impl VideoFrame {
    pub fn new(pixels: RgbImage, captured_at: f64) -> Self {
        Self {
            pixels: Arc::new(pixels),
            captured_at,
        }
    }

    /// Solid black frame, used when a replayed track has no image for a frame.
    pub fn blank(width: u32, height: u32, captured_at: f64) -> Self {
        Self::new(RgbImage::new(width, height), captured_at)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}
