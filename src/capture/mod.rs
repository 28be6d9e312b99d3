//! Frame acquisition: the capture-device boundary and the latest-frame slot.

use crate::clock;
use crate::errors::Result;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod source;

pub use source::FrameSource;

/// One captured frame: raw image buffer plus capture timestamp.
///
/// Produced and exclusively overwritten by [`FrameSource`]; consumers only
/// ever see read-only `Arc` snapshots.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Capture wall-clock time, fractional seconds since the UNIX epoch.
    pub captured_at: f64,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: f64) -> Self {
        Self { image, captured_at }
    }
}

/// The capture boundary: a blocking device handle.
///
/// Implementations wrap whatever actually produces frames (V4L2, RTSP, a
/// simulator). `read_frame` blocks until the next frame or an error; the
/// acquisition loop retries errors indefinitely with a short delay.
pub trait CaptureDevice: Send {
    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Releases the underlying device handle.
    fn release(&mut self);
}

/// Synthetic capture device used by the demo binary and the integration
/// tests: a bright moving bar over a mid-gray background, switchable to an
/// all-black feed to simulate a covered lens.
pub struct TestPatternDevice {
    width: u32,
    height: u32,
    frame_interval: Duration,
    dark: Arc<AtomicBool>,
    tick: u64,
}

impl TestPatternDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_interval: Duration::from_millis(33),
            dark: Arc::new(AtomicBool::new(false)),
            tick: 0,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Shared switch: set `true` to start producing all-black frames.
    pub fn dark_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dark)
    }
}

impl CaptureDevice for TestPatternDevice {
    fn read_frame(&mut self) -> Result<Frame> {
        std::thread::sleep(self.frame_interval);
        self.tick = self.tick.wrapping_add(1);

        let image = if self.dark.load(Ordering::Relaxed) {
            RgbImage::from_pixel(self.width, self.height, image::Rgb([0, 0, 0]))
        } else {
            // Bar position advances every frame so consecutive frames differ.
            let bar = (self.tick as u32 * 7) % self.width;
            let bar_width = (self.width / 8).max(1);
            RgbImage::from_fn(self.width, self.height, |x, _| {
                let offset = (x + self.width - bar) % self.width;
                if offset < bar_width {
                    image::Rgb([230, 230, 230])
                } else {
                    image::Rgb([120, 120, 120])
                }
            })
        };

        Ok(Frame::new(image, clock::epoch_secs()))
    }

    fn release(&mut self) {}
}
