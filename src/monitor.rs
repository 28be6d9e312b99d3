//! Supervisory loop tying capture, detection, alert dispatch and the log
//! sink together, plus the runtime flags and status snapshot exposed to
//! operators.

use crate::alert::{AlertDispatcher, NotificationRequest};
use crate::capture::FrameSource;
use crate::clock;
use crate::config::AlertContacts;
use crate::detector::ObstructionDetector;
use crate::store::{AlertEvent, LogSink};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

const DEFAULT_TICK: Duration = Duration::from_millis(100);
const STATUS_RECENT_LIMIT: usize = 20;

pub const MANUAL_ATTACK_REASON: &str = "Manual attack toggled";

/// Coarse pipeline status reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorStatus {
    Stopped,
    Running,
    Alert,
}

/// Point-in-time view of the runtime flags plus the recent alert log.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub detection_enabled: bool,
    pub inject_enabled: bool,
    pub manual_attack: bool,
    pub status: MonitorStatus,
    pub last_alert_time: Option<String>,
    pub recent_log: Vec<AlertEvent>,
}

#[derive(Debug)]
struct Flags {
    detection_enabled: bool,
    inject_enabled: bool,
    manual_attack: bool,
    status: MonitorStatus,
    last_alert_time: Option<String>,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            detection_enabled: true,
            inject_enabled: false,
            manual_attack: false,
            status: MonitorStatus::Stopped,
            last_alert_time: None,
        }
    }
}

/// Operator-facing runtime switches. Shared between the detection loop and
/// whatever control surface flips them; every method takes the lock briefly
/// and never awaits while holding it.
#[derive(Default)]
pub struct RuntimeState {
    flags: Mutex<Flags>,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start_detection(&self) {
        let mut flags = self.lock();
        flags.detection_enabled = true;
        flags.status = MonitorStatus::Running;
    }

    pub fn stop_detection(&self) {
        let mut flags = self.lock();
        flags.detection_enabled = false;
        flags.status = MonitorStatus::Stopped;
    }

    /// Flips the manual-attack override; returns the new value.
    pub fn toggle_manual_attack(&self) -> bool {
        let mut flags = self.lock();
        flags.manual_attack = !flags.manual_attack;
        flags.manual_attack
    }

    /// Flips injection mode; returns the new value. While enabled the
    /// detection loop is bypassed entirely.
    pub fn toggle_inject(&self) -> bool {
        let mut flags = self.lock();
        flags.inject_enabled = !flags.inject_enabled;
        flags.inject_enabled
    }

    pub fn detection_enabled(&self) -> bool {
        self.lock().detection_enabled
    }

    pub fn inject_enabled(&self) -> bool {
        self.lock().inject_enabled
    }

    pub fn manual_attack(&self) -> bool {
        self.lock().manual_attack
    }

    pub fn status(&self) -> MonitorStatus {
        self.lock().status
    }

    pub fn set_status(&self, status: MonitorStatus) {
        self.lock().status = status;
    }

    /// Marks an alert: status goes to `Alert` and the readable timestamp is
    /// retained for the snapshot.
    pub fn record_alert(&self, readable: &str) {
        let mut flags = self.lock();
        flags.status = MonitorStatus::Alert;
        flags.last_alert_time = Some(readable.to_string());
    }

    pub fn snapshot_with(&self, recent_log: Vec<AlertEvent>) -> StatusSnapshot {
        let flags = self.lock();
        StatusSnapshot {
            detection_enabled: flags.detection_enabled,
            inject_enabled: flags.inject_enabled,
            manual_attack: flags.manual_attack,
            status: flags.status,
            last_alert_time: flags.last_alert_time.clone(),
            recent_log,
        }
    }
}

/// Owns the detection loop: polls the latest frame, advances the detector
/// and fans alerts out to the sink and the dispatcher.
pub struct Monitor {
    source: FrameSource,
    detector: ObstructionDetector,
    dispatcher: AlertDispatcher,
    sink: Arc<LogSink>,
    state: Arc<RuntimeState>,
    contacts: AlertContacts,
    device_label: String,
    tick: Duration,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Monitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: FrameSource,
        detector: ObstructionDetector,
        dispatcher: AlertDispatcher,
        sink: Arc<LogSink>,
        state: Arc<RuntimeState>,
        contacts: AlertContacts,
        device_label: String,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            source,
            detector,
            dispatcher,
            sink,
            state,
            contacts,
            device_label,
            tick: DEFAULT_TICK,
            shutdown_rx,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Runs until the shutdown signal fires. Stops the frame source and
    /// flips the status to `Stopped` on the way out.
    pub async fn run(mut self) {
        info!("monitor started for {}", self.device_label);
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("monitor shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.step().await;
                }
            }
        }

        self.source.stop();
        self.state.set_status(MonitorStatus::Stopped);
    }

    async fn step(&mut self) {
        if !self.state.detection_enabled() || self.state.inject_enabled() {
            return;
        }

        let now = clock::epoch_secs();
        let result = if self.state.manual_attack() {
            self.detector.force_alert(now, MANUAL_ATTACK_REASON)
        } else {
            let frame = match self.source.read() {
                Some(frame) => frame,
                None => {
                    debug!("no frame available yet");
                    return;
                }
            };
            self.detector.process(&frame, now)
        };

        if result.is_alert() {
            let reason = result
                .reason
                .unwrap_or_else(|| MANUAL_ATTACK_REASON.to_string());
            self.handle_alert(&reason, now).await;
        } else {
            self.state.set_status(MonitorStatus::Running);
        }
    }

    async fn handle_alert(&self, reason: &str, now: f64) {
        let event = AlertEvent::new(&self.device_label, reason, now);
        self.state.record_alert(&event.readable);
        warn!("ALERT on {}: {} at {}", event.device, event.reason, event.readable);

        let body = format!("Alert: {}\nDevice: {}\nTime: {}\n", event.reason, event.device, event.readable);
        if let Err(err) = self.sink.record(event).await {
            error!("failed to persist alert event: {}", err);
        }

        self.dispatcher.notify(NotificationRequest {
            subject: "[lens-vigil] Camera obstruction alert".to_string(),
            body,
            email_recipients: self.contacts.email_recipients.clone(),
            sms_recipient: self.contacts.sms_recipient.clone(),
        });
    }
}

/// Builds the operator status view: flags plus the most recent alerts.
pub async fn status(state: &RuntimeState, sink: &LogSink) -> StatusSnapshot {
    state.snapshot_with(sink.recent(STATUS_RECENT_LIMIT).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_stopped_with_detection_enabled() {
        let state = RuntimeState::new();
        assert!(state.detection_enabled());
        assert!(!state.inject_enabled());
        assert!(!state.manual_attack());
        assert_eq!(state.status(), MonitorStatus::Stopped);
    }

    #[test]
    fn toggles_flip_and_report_new_value() {
        let state = RuntimeState::new();
        assert!(state.toggle_manual_attack());
        assert!(!state.toggle_manual_attack());
        assert!(state.toggle_inject());
        assert!(!state.toggle_inject());
    }

    #[test]
    fn stop_detection_marks_stopped() {
        let state = RuntimeState::new();
        state.start_detection();
        assert_eq!(state.status(), MonitorStatus::Running);
        state.stop_detection();
        assert!(!state.detection_enabled());
        assert_eq!(state.status(), MonitorStatus::Stopped);
    }

    #[test]
    fn record_alert_updates_snapshot() {
        let state = RuntimeState::new();
        state.start_detection();
        state.record_alert("2026-08-28 10:00:00");

        let snapshot = state.snapshot_with(Vec::new());
        assert_eq!(snapshot.status, MonitorStatus::Alert);
        assert_eq!(
            snapshot.last_alert_time.as_deref(),
            Some("2026-08-28 10:00:00")
        );
        assert!(snapshot.recent_log.is_empty());
    }
}
