//! Continuous acquisition loop exposing the most recent frame.

use super::{CaptureDevice, Frame};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Owns the acquisition thread and the single overwritten frame slot.
///
/// The slot is latest-wins and lossy: a slow consumer may observe the same
/// frame twice or skip frames entirely, which is fine because the detector's
/// timing is wall-clock based, not frame-count based. Device read failures
/// are retried indefinitely with a short fixed delay and never surface to
/// readers.
pub struct FrameSource {
    slot: Arc<Mutex<Option<Arc<Frame>>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameSource {
    /// Starts acquisition on a dedicated thread (device reads are blocking).
    pub fn start(device: Box<dyn CaptureDevice>) -> Self {
        Self::start_with_retry_delay(device, DEFAULT_RETRY_DELAY)
    }

    pub fn start_with_retry_delay(device: Box<dyn CaptureDevice>, retry_delay: Duration) -> Self {
        let slot: Arc<Mutex<Option<Arc<Frame>>>> = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));

        let loop_slot = Arc::clone(&slot);
        let loop_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("frame-source".to_string())
            .spawn(move || acquisition_loop(device, loop_slot, loop_stop, retry_delay))
            .ok();

        Self {
            slot,
            stop,
            handle,
        }
    }

    /// Returns the most recently captured frame, or `None` if nothing has
    /// ever been captured. Never blocks on the producer, never errors.
    pub fn read(&self) -> Option<Arc<Frame>> {
        self.slot.lock().map(|guard| guard.clone()).unwrap_or(None)
    }

    /// Halts acquisition and releases the device. A blocking in-flight read
    /// finishes on its own schedule before the thread exits.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn acquisition_loop(
    mut device: Box<dyn CaptureDevice>,
    slot: Arc<Mutex<Option<Arc<Frame>>>>,
    stop: Arc<AtomicBool>,
    retry_delay: Duration,
) {
    info!("frame acquisition started");
    while !stop.load(Ordering::Relaxed) {
        match device.read_frame() {
            Ok(frame) => {
                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(Arc::new(frame));
                }
            }
            Err(e) => {
                debug!("capture read failed, retrying: {}", e);
                thread::sleep(retry_delay);
            }
        }
    }
    device.release();
    info!("frame acquisition stopped");
}
