//! Sustained camera-obstruction detection with rate-limited alerting.
//!
//! The pipeline is a frame acquisition loop feeding a stateful obstruction
//! detector, gated by a cooldown, which triggers fire-and-forget notification
//! dispatch and durable event logging:
//!
//! `FrameSource -> ObstructionDetector::process -> DetectionResult`
//! and, on alert, `LogSink::record` plus `AlertDispatcher::notify`,
//! both off the hot path.

pub mod alert;
pub mod capture;
pub mod clock;
pub mod config;
pub mod detector;
pub mod errors;
pub mod logging;
pub mod monitor;
pub mod store;

pub use errors::{BoxError, Error, ErrorKind, Result};
