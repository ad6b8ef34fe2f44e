//! Outgoing email for notifications.
//!
//! There is no real mail integration. `SimulatedMailer` waits a fixed delay
//! and reports success; `RelayMailer` additionally forwards the message to an
//! HTTP relay but still reports success when the relay is unreachable.
//!
//! `AppState` holds an `Arc<dyn Mailer>` chosen at startup from config.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailReceipt {
    pub message_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub delivered_via: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<EmailReceipt, AppError>;
}

pub struct SimulatedMailer {
    pub delay: Duration,
}

#[async_trait]
impl Mailer for SimulatedMailer {
    async fn send(&self, message: &EmailMessage) -> Result<EmailReceipt, AppError> {
        tokio::time::sleep(self.delay).await;
        info!("Simulated email to {}: {}", message.to, message.subject);
        Ok(EmailReceipt {
            message_id: Uuid::new_v4(),
            sent_at: Utc::now(),
            delivered_via: "simulated".to_string(),
        })
    }
}

pub struct RelayMailer {
    client: Client,
    url: String,
    delay: Duration,
}

impl RelayMailer {
    pub fn new(url: String, delay: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            delay,
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: &EmailMessage) -> Result<EmailReceipt, AppError> {
        tokio::time::sleep(self.delay).await;

        let delivered_via = match self.client.post(&self.url).json(message).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Relayed email to {} via {}", message.to, self.url);
                "relay".to_string()
            }
            Ok(resp) => {
                warn!("Mail relay returned {} for {}", resp.status(), message.to);
                "simulated".to_string()
            }
            Err(e) => {
                warn!("Mail relay unreachable: {e}");
                "simulated".to_string()
            }
        };

        Ok(EmailReceipt {
            message_id: Uuid::new_v4(),
            sent_at: Utc::now(),
            delivered_via,
        })
    }
}

pub fn validate_email_message(message: &EmailMessage) -> Result<(), AppError> {
    let to = message.to.trim();
    let looks_like_address = to
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !looks_like_address {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid recipient address",
            message.to
        )));
    }
    if message.subject.trim().is_empty() {
        return Err(AppError::Validation("subject cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Interview invite".to_string(),
            body: "See you at 10".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_mailer_always_succeeds_after_delay() {
        let mailer = SimulatedMailer {
            delay: Duration::from_millis(1000),
        };
        let started = tokio::time::Instant::now();
        let receipt = mailer.send(&message("a@b.com")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(receipt.delivered_via, "simulated");
    }

    #[tokio::test]
    async fn test_relay_failure_still_succeeds() {
        let mailer = RelayMailer::new("http://127.0.0.1:9/relay".to_string(), Duration::ZERO);
        let receipt = mailer.send(&message("a@b.com")).await.unwrap();
        assert_eq!(receipt.delivered_via, "simulated");
    }

    #[test]
    fn test_recipient_validation() {
        assert!(validate_email_message(&message("hr@company.io")).is_ok());
        assert!(validate_email_message(&message("not-an-address")).is_err());
        assert!(validate_email_message(&message("@company.io")).is_err());
    }
}
