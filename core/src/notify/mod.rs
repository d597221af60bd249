//! Submission notifications.
//!
//! Every accepted submission produces two messages: an alert to the admin
//! mailbox and a welcome note to the submitter. [`NotificationDispatcher`]
//! sends both on a spawned task with exponential-backoff retry; failures
//! are logged and never reach the submitter.

pub mod messages;
pub mod webhook;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::NotificationConfig;
use crate::submission::Submission;

pub use webhook::WebhookNotifier;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    AdminAlert,
    Welcome,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminAlert => "admin_alert",
            Self::Welcome => "welcome",
        }
    }
}

/// A rendered plain-text message ready for delivery.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub submission_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification relay unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    #[error("notification rejected (HTTP {status})")]
    Rejected { status: u16 },

    #[error("notifier misconfigured: {0}")]
    Config(String),
}

impl NotifyError {
    /// Transport failures, 5xx and 429 are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable { .. })
    }
}

/// A channel that can deliver one [`OutboundMessage`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotifyError>;
}

/// Records messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        tracing::info!(
            kind = message.kind.as_str(),
            submission_id = %message.submission_id,
            to = %message.to,
            subject = %message.subject,
            "Notification (log only)"
        );
        Ok(())
    }
}

/// Keeps delivered messages in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<OutboundMessage>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.delivered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Fire-and-forget sender for per-submission notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    config: Arc<NotificationConfig>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: NotificationConfig) -> Self {
        Self {
            notifier,
            config: Arc::new(config),
        }
    }

    /// Webhook delivery when a relay URL is configured, log-only otherwise.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let notifier: Arc<dyn Notifier> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(
                url,
                config.webhook_token.clone(),
                Duration::from_millis(config.timeout_ms),
            )?),
            None => {
                tracing::info!("No notification webhook configured, notifications will be logged");
                Arc::new(LogNotifier)
            }
        };
        Ok(Self::new(notifier, config.clone()))
    }

    /// Spawn delivery of both messages for `submission` and return at once.
    ///
    /// Must be called from within a tokio runtime. The handle may be dropped.
    pub fn dispatch(&self, submission: &Submission) -> JoinHandle<()> {
        let admin = messages::admin_alert(submission, &self.config);
        let welcome = messages::welcome(submission, &self.config);
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let (admin_result, welcome_result) = tokio::join!(
                dispatcher.deliver_with_retry(&admin),
                dispatcher.deliver_with_retry(&welcome)
            );
            for (message, result) in [(&admin, admin_result), (&welcome, welcome_result)] {
                match result {
                    Ok(()) => tracing::debug!(
                        kind = message.kind.as_str(),
                        submission_id = %message.submission_id,
                        "Notification delivered"
                    ),
                    Err(err) => tracing::error!(
                        kind = message.kind.as_str(),
                        submission_id = %message.submission_id,
                        error = %err,
                        "Notification failed"
                    ),
                }
            }
        })
    }

    /// Deliver one message, retrying retryable failures with backoff.
    pub async fn deliver_with_retry(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let retry = &self.config.retry;
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(retry.initial_backoff_ms))
            .with_max_delay(Duration::from_millis(retry.max_backoff_ms))
            .with_max_times(retry.max_attempts.saturating_sub(1));

        let notifier = &*self.notifier;
        (|| async move { notifier.deliver(message).await })
            .retry(backoff)
            .when(NotifyError::is_retryable)
            .notify(|err: &NotifyError, delay: Duration| {
                tracing::warn!(
                    kind = message.kind.as_str(),
                    submission_id = %message.submission_id,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Notification attempt failed, retrying"
                );
            })
            .await
    }
}
