//! Stateful obstruction detector.
//!
//! Classifies one frame at a time against a blurred grayscale baseline.
//! An alert fires after `obstruction_seconds` of continuous dark+static
//! frames, then a cooldown suppresses further alerts and freezes the
//! baseline until it expires.

use crate::capture::Frame;
use crate::config::DetectorConfig;
use crate::errors::{DetectorError, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use log::warn;
use serde::Serialize;

/// Per-pixel absolute difference above which a pixel counts as changed
/// (8-bit scale). Resolution-dependent together with
/// `motion_diff_threshold`; kept as an explicit constant rather than an
/// adaptive scheme.
const PIXEL_DIFF_THRESHOLD: u8 = 25;

/// Floor of the downscaled working resolution (0.5x with a minimum).
const MIN_WORKING_WIDTH: u32 = 160;
const MIN_WORKING_HEIGHT: u32 = 120;

/// Gaussian blur applied to suppress sensor noise before differencing.
const BLUR_SIGMA: f32 = 1.0;

pub const SUSTAINED_OBSTRUCTION: &str = "Sustained obstruction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionStatus {
    /// Baseline not yet established for this frame size.
    Initializing,
    /// Frame is clear; baseline updated.
    Ok,
    /// Dark+static observed but not yet sustained long enough.
    Candidate,
    /// Alert emitted on this frame.
    Alerted,
    /// Inside the refractory interval; detection suspended.
    Cooldown,
}

/// Immutable per-frame verdict. Never retained by the detector.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub status: DetectionStatus,
    pub reason: Option<String>,
    pub brightness: f32,
    pub motion_pixels: u32,
    /// Elapsed obstruction seconds in `Candidate`, remaining cooldown
    /// seconds in `Cooldown`, total elapsed at the instant of `Alerted`.
    pub seconds: Option<u64>,
}

impl DetectionResult {
    pub fn is_alert(&self) -> bool {
        self.status == DetectionStatus::Alerted
    }

    fn quiet(status: DetectionStatus, seconds: Option<u64>) -> Self {
        Self {
            status,
            reason: None,
            brightness: 0.0,
            motion_pixels: 0,
            seconds,
        }
    }
}

/// Obstruction state machine. Exclusively owned by one caller; a single
/// consuming loop advances it.
pub struct ObstructionDetector {
    config: DetectorConfig,
    previous_gray: Option<GrayImage>,
    obstruction_start: Option<f64>,
    last_alert_ts: f64,
}

impl ObstructionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            previous_gray: None,
            obstruction_start: None,
            last_alert_ts: 0.0,
        }
    }

    /// Clears all state: baseline, obstruction timer and cooldown.
    pub fn reset(&mut self) {
        self.previous_gray = None;
        self.obstruction_start = None;
        self.last_alert_ts = 0.0;
    }

    pub fn last_alert_ts(&self) -> f64 {
        self.last_alert_ts
    }

    /// Classifies one frame at wall-clock time `now` (epoch seconds).
    ///
    /// Any internal processing fault is caught here and mapped to a clear
    /// `Ok` verdict for that frame: fail-safe against false positives,
    /// fail-open against a missed detection on the faulted frame.
    pub fn process(&mut self, frame: &Frame, now: f64) -> DetectionResult {
        match self.evaluate(frame, now) {
            Ok(result) => result,
            Err(e) => {
                warn!("detector fault, treating frame as clear: {}", e);
                DetectionResult::quiet(DetectionStatus::Ok, None)
            }
        }
    }

    /// Forces an alert outside the per-frame algorithm (manual override).
    ///
    /// Follows the identical `last_alert_ts` and downstream path as a
    /// natural detection, including the cooldown gate, so downstream
    /// behavior is indistinguishable.
    pub fn force_alert(&mut self, now: f64, reason: &str) -> DetectionResult {
        if let Some(remaining) = self.cooldown_remaining(now) {
            return DetectionResult::quiet(DetectionStatus::Cooldown, Some(remaining));
        }
        self.last_alert_ts = now;
        self.obstruction_start = None;
        DetectionResult {
            status: DetectionStatus::Alerted,
            reason: Some(reason.to_string()),
            brightness: 0.0,
            motion_pixels: 0,
            seconds: None,
        }
    }

    fn evaluate(&mut self, frame: &Frame, now: f64) -> Result<DetectionResult> {
        // Cooldown first: neither the baseline nor the obstruction timer is
        // touched until it expires.
        if let Some(remaining) = self.cooldown_remaining(now) {
            return Ok(DetectionResult::quiet(
                DetectionStatus::Cooldown,
                Some(remaining),
            ));
        }

        let (width, height) = frame.image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::EmptyFrame { width, height }.into());
        }

        let gray = working_image(&frame.image);
        let brightness = mean_brightness(&gray);

        let Some(previous) = self.previous_gray.as_ref() else {
            self.previous_gray = Some(gray);
            return Ok(DetectionResult {
                status: DetectionStatus::Initializing,
                reason: None,
                brightness,
                motion_pixels: 0,
                seconds: None,
            });
        };

        // A device resolution change invalidates the baseline.
        if previous.dimensions() != gray.dimensions() {
            self.previous_gray = Some(gray);
            self.obstruction_start = None;
            return Ok(DetectionResult {
                status: DetectionStatus::Initializing,
                reason: None,
                brightness,
                motion_pixels: 0,
                seconds: None,
            });
        }

        let motion_pixels = motion_pixel_count(previous, &gray);
        let dark = brightness < self.config.brightness_low as f32;
        let is_static = motion_pixels < self.config.motion_diff_threshold;

        if dark && is_static {
            let started = *self.obstruction_start.get_or_insert(now);
            let elapsed = now - started;
            if elapsed >= self.config.obstruction_seconds as f64 {
                self.last_alert_ts = now;
                self.obstruction_start = None;
                return Ok(DetectionResult {
                    status: DetectionStatus::Alerted,
                    reason: Some(SUSTAINED_OBSTRUCTION.to_string()),
                    brightness,
                    motion_pixels,
                    seconds: Some(elapsed as u64),
                });
            }
            // Baseline is intentionally not updated while the condition
            // holds, so a slow fade stays comparable to the pre-cover view.
            return Ok(DetectionResult {
                status: DetectionStatus::Candidate,
                reason: None,
                brightness,
                motion_pixels,
                seconds: Some(elapsed as u64),
            });
        }

        self.obstruction_start = None;
        self.previous_gray = Some(gray);
        Ok(DetectionResult {
            status: DetectionStatus::Ok,
            reason: None,
            brightness,
            motion_pixels,
            seconds: None,
        })
    }

    fn cooldown_remaining(&self, now: f64) -> Option<u64> {
        let since = now - self.last_alert_ts;
        let cooldown = self.config.cooldown_seconds as f64;
        if since < cooldown {
            Some((cooldown - since) as u64)
        } else {
            None
        }
    }
}

/// Downscales to a bounded working resolution, converts to single-channel
/// intensity and blurs with a fixed kernel.
fn working_image(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let target_w = (width / 2).max(MIN_WORKING_WIDTH);
    let target_h = (height / 2).max(MIN_WORKING_HEIGHT);
    let small = imageops::resize(image, target_w, target_h, FilterType::Triangle);
    let gray = imageops::grayscale(&small);
    imageops::blur(&gray, BLUR_SIGMA)
}

fn mean_brightness(image: &GrayImage) -> f32 {
    let count = (image.width() * image.height()) as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    sum as f32 / count as f32
}

fn motion_pixel_count(previous: &GrayImage, current: &GrayImage) -> u32 {
    previous
        .pixels()
        .zip(current.pixels())
        .filter(|(a, b)| a[0].abs_diff(b[0]) > PIXEL_DIFF_THRESHOLD)
        .count() as u32
}
