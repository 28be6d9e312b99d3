//! Notification channels and the delivery-transport boundary.
//!
//! The concrete wire transports (SMTP client, SMS provider API) live outside
//! this crate behind [`MailTransport`] and [`SmsTransport`]; the channels own
//! the policy around them: configuration gating, per-channel isolation and
//! the email send timeout.

use super::NotificationRequest;
use crate::errors::{NotifyError, Result};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Bounded wait applied to the email channel only; the SMS channel has no
/// send timeout.
pub const EMAIL_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// One notification channel attempted by the dispatcher.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether credentials/configuration for this channel are present.
    /// Unconfigured channels are skipped, not failed.
    fn is_configured(&self) -> bool;

    async fn send(&self, request: &NotificationRequest) -> Result<()>;
}

/// Email delivery boundary.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_mail(&self, recipients: &[String], subject: &str, body: &str) -> Result<()>;
}

/// SMS delivery boundary.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, recipient: &str, body: &str) -> Result<()>;
}

pub struct EmailChannel {
    transport: Option<Arc<dyn MailTransport>>,
    send_timeout: Duration,
}

impl EmailChannel {
    /// `transport` is `None` when SMTP credentials are absent.
    pub fn new(transport: Option<Arc<dyn MailTransport>>) -> Self {
        Self {
            transport,
            send_timeout: EMAIL_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        let Some(transport) = &self.transport else {
            return Err(NotifyError::NotConfigured.into());
        };
        if request.email_recipients.is_empty() {
            debug!("no email recipients configured, nothing to send");
            return Ok(());
        }
        timeout(
            self.send_timeout,
            transport.send_mail(&request.email_recipients, &request.subject, &request.body),
        )
        .await
        .map_err(|_| NotifyError::Timeout(self.send_timeout))??;
        Ok(())
    }
}

pub struct SmsChannel {
    transport: Option<Arc<dyn SmsTransport>>,
}

impl SmsChannel {
    /// `transport` is `None` when provider credentials are absent.
    pub fn new(transport: Option<Arc<dyn SmsTransport>>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AlertChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        let Some(transport) = &self.transport else {
            return Err(NotifyError::NotConfigured.into());
        };
        let Some(recipient) = &request.sms_recipient else {
            debug!("no sms recipient configured, nothing to send");
            return Ok(());
        };
        transport.send_sms(recipient, &request.body).await
    }
}
