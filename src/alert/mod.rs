//! Fire-and-forget alert notification.

use log::{error, info};
use std::sync::Arc;

pub mod channels;

pub use channels::{AlertChannel, EmailChannel, MailTransport, SmsChannel, SmsTransport};

/// Ephemeral payload consumed by the dispatcher. Recipients come from
/// process configuration, not from the detection path.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub subject: String,
    pub body: String,
    pub email_recipients: Vec<String>,
    pub sms_recipient: Option<String>,
}

/// Attempts every configured channel independently on its own unsupervised
/// task. Delivery is at-most-once, best-effort: no retry, no acknowledgement,
/// no ordering between channels.
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    /// Returns immediately; never blocks the detection loop on network I/O.
    ///
    /// Unconfigured channels are skipped (logged, not failed). A failure in
    /// one channel never prevents or delays another.
    pub fn notify(&self, request: NotificationRequest) {
        for channel in &self.channels {
            if !channel.is_configured() {
                info!("{} channel not configured, skipping", channel.name());
                continue;
            }
            let channel = Arc::clone(channel);
            let request = request.clone();
            tokio::spawn(async move {
                if let Err(e) = channel.send(&request).await {
                    error!("{} notification failed: {}", channel.name(), e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BoxError, NotifyError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio::time::sleep;

    struct CountingChannel {
        configured: bool,
        fail: bool,
        delay: Duration,
        sent: Arc<AtomicUsize>,
    }

    impl CountingChannel {
        fn new(configured: bool, fail: bool, delay: Duration) -> (Arc<Self>, Arc<AtomicUsize>) {
            let sent = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    configured,
                    fail,
                    delay,
                    sent: Arc::clone(&sent),
                }),
                sent,
            )
        }
    }

    #[async_trait]
    impl AlertChannel for CountingChannel {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn send(&self, _request: &NotificationRequest) -> Result<()> {
            sleep(self.delay).await;
            if self.fail {
                return Err(NotifyError::DeliveryFailed(BoxError::from("boom")).into());
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request() -> NotificationRequest {
        NotificationRequest {
            subject: "subject".to_string(),
            body: "body".to_string(),
            email_recipients: vec!["ops@example.com".to_string()],
            sms_recipient: Some("+15550000000".to_string()),
        }
    }

    #[tokio::test]
    async fn unconfigured_channels_are_skipped() {
        let (channel, sent) = CountingChannel::new(false, false, Duration::ZERO);
        let dispatcher = AlertDispatcher::new(vec![channel]);
        dispatcher.notify(request());
        sleep(Duration::from_millis(50)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_failing_channel_never_blocks_another() {
        let (failing, _) = CountingChannel::new(true, true, Duration::ZERO);
        let (healthy, sent) = CountingChannel::new(true, false, Duration::ZERO);
        let dispatcher = AlertDispatcher::new(vec![failing, healthy]);
        dispatcher.notify(request());
        sleep(Duration::from_millis(100)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn notify_returns_without_waiting_for_delivery() {
        let (slow, sent) = CountingChannel::new(true, false, Duration::from_secs(2));
        let dispatcher = AlertDispatcher::new(vec![slow]);

        let started = Instant::now();
        dispatcher.notify(request());
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }
}
