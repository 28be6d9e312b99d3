//! Process configuration sourced from environment-style settings.
//!
//! Every knob has a default; malformed values are logged and fall back to the
//! default rather than aborting startup.

use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Detection thresholds. All values are positive integers.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Seconds of continuous dark+static frames before an alert fires.
    pub obstruction_seconds: u64,
    /// Changed-pixel count below which a frame counts as static.
    pub motion_diff_threshold: u32,
    /// Mean brightness below which a frame counts as dark (8-bit scale).
    pub brightness_low: u8,
    /// Refractory interval after an alert during which no new alert fires.
    pub cooldown_seconds: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            obstruction_seconds: 12,
            motion_diff_threshold: 2500,
            brightness_low: 25,
            cooldown_seconds: 300,
        }
    }
}

impl DetectorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            obstruction_seconds: env_or("OBSTRUCTION_SECONDS", defaults.obstruction_seconds),
            motion_diff_threshold: env_or("MOTION_DIFF_THRESHOLD", defaults.motion_diff_threshold),
            brightness_low: env_or("BRIGHTNESS_LOW", defaults.brightness_low),
            cooldown_seconds: env_or("COOLDOWN_SECONDS", defaults.cooldown_seconds),
        }
    }
}

/// Capture-device boundary settings.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Device identifier: an index or URI, passed through to the device layer.
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            width: 640,
            height: 480,
        }
    }
}

impl CaptureConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            device: env::var("CAMERA_INDEX").unwrap_or(defaults.device),
            width: env_or("CAMERA_WIDTH", defaults.width),
            height: env_or("CAMERA_HEIGHT", defaults.height),
        }
    }

    /// Human-readable label attached to alert events.
    pub fn device_label(&self) -> String {
        format!("camera-{}", self.device)
    }
}

/// Where alert notifications go. Absent settings disable the channel.
#[derive(Debug, Clone, Default)]
pub struct AlertContacts {
    pub email_recipients: Vec<String>,
    pub sms_recipient: Option<String>,
}

impl AlertContacts {
    pub fn from_env() -> Self {
        Self {
            email_recipients: env::var("ALERT_EMAIL")
                .map(|raw| parse_recipients(&raw))
                .unwrap_or_default(),
            sms_recipient: env::var("ALERT_PHONE").ok().filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub capture: CaptureConfig,
    pub contacts: AlertContacts,
    /// Durable event log path; unset keeps events in memory only.
    pub log_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            detector: DetectorConfig::from_env(),
            capture: CaptureConfig::from_env(),
            contacts: AlertContacts::from_env(),
            log_path: env::var("LOG_DB_PATH").ok().map(PathBuf::from),
        }
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!("invalid value {:?} for {}, using default {}", raw, key, default);
            default
        }
    }
}
