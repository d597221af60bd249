//! Mail-relay webhook notifier.
//!
//! POSTs each [`OutboundMessage`] as JSON to a relay that owns SMTP
//! credentials and templates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{Notifier, NotifyError, OutboundMessage};

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotifyError::Config(format!(
                "webhook URL must be http(s): {url}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        classify_status(response.status())
    }
}

fn classify_status(status: StatusCode) -> Result<(), NotifyError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(NotifyError::Unavailable {
            status: status.as_u16(),
        })
    } else {
        Err(NotifyError::Rejected {
            status: status.as_u16(),
        })
    }
}
